//! Service container wiring configuration, session, cache and backend.

use std::sync::Arc;

use superate_cache::{
    spawn_garbage_collector, BackgroundTask, QueryClient, QueryKey, QueryResource,
};
use superate_core::{ActivityWriter, Clock, DataService, Route, SuperateConfig, SystemClock, UserId};

use crate::error::ClientResult;
use crate::heartbeat::{spawn_heartbeat, HeartbeatHandle};
use crate::queries::DataQueries;
use crate::rest::RestDataService;
use crate::router::{spawn_dashboard_redirect, HistoryNavigator, Navigator, RouteGuard};
use crate::session::SessionStore;

/// Everything a client session needs, constructed once at startup.
pub struct AppServices {
    config: SuperateConfig,
    sessions: SessionStore,
    queries: DataQueries,
    activity: Arc<dyn ActivityWriter>,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    tasks: Vec<BackgroundTask>,
}

impl AppServices {
    pub fn new(
        config: SuperateConfig,
        service: Arc<dyn DataService>,
        activity: Arc<dyn ActivityWriter>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = QueryClient::with_clock(clock.clone());
        Self {
            config,
            sessions: SessionStore::new(),
            queries: DataQueries::new(cache, service),
            activity,
            navigator,
            clock,
            tasks: Vec::new(),
        }
    }

    /// Wire the REST backend of the configured environment.
    pub fn from_config(config: SuperateConfig) -> ClientResult<Self> {
        let rest = Arc::new(RestDataService::from_config(&config)?);
        tracing::info!(
            environment = ?config.environment,
            data_api_url = %rest.base_url(),
            "Client services configured"
        );
        Ok(Self::new(
            config,
            rest.clone(),
            rest,
            Arc::new(HistoryNavigator::new(Route::Home)),
            Arc::new(SystemClock),
        ))
    }

    /// Spawn the background tasks: cache GC, dashboard redirect and the
    /// forced refresh of the active-session count.
    pub fn start(&mut self) {
        if !self.tasks.is_empty() {
            tracing::warn!("Client services already started");
            return;
        }
        self.tasks.push(spawn_garbage_collector(
            self.queries.cache().clone(),
            self.config.cache_gc_interval(),
        ));
        self.tasks.push(spawn_dashboard_redirect(
            self.sessions.subscribe(),
            self.navigator.clone(),
        ));
        if let Some(task) = self
            .queries
            .spawn_refresh(QueryKey::new(QueryResource::ActiveSessions))
        {
            self.tasks.push(task);
        }
        tracing::info!(tasks = self.tasks.len(), "Client services started");
    }

    /// Start the activity heartbeat for a signed-in user.
    pub fn start_heartbeat(&self, user: UserId) -> HeartbeatHandle {
        spawn_heartbeat(
            user,
            self.activity.clone(),
            self.clock.clone(),
            self.config.heartbeat_cooldown(),
        )
    }

    pub fn route_guard(&self) -> RouteGuard {
        RouteGuard::new(self.navigator.clone())
    }

    pub fn config(&self) -> &SuperateConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn queries(&self) -> &DataQueries {
        &self.queries
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Stop every background task, waiting for in-flight work.
    pub async fn shutdown(self) {
        let count = self.tasks.len();
        for task in self.tasks {
            task.shutdown().await;
        }
        tracing::info!(tasks = count, "Client services stopped");
    }
}
