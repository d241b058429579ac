//! Navigation, dashboard redirect and route guarding.

use std::sync::{Arc, Mutex};

use superate_cache::BackgroundTask;
use superate_core::{
    check_access, resolve_dashboard, AuthState, GuardDecision, NavigationError, Route,
};
use tokio::sync::watch;

/// Client-side navigation surface.
pub trait Navigator: Send + Sync {
    /// The route currently shown.
    fn current(&self) -> Route;

    /// Navigate, adding a history entry.
    fn push(&self, route: Route) -> Result<(), NavigationError>;

    /// Navigate, replacing the current history entry.
    fn replace(&self, route: Route) -> Result<(), NavigationError>;
}

/// In-memory history stack.
#[derive(Debug)]
pub struct HistoryNavigator {
    stack: Mutex<Vec<Route>>,
}

impl HistoryNavigator {
    pub fn new(initial: Route) -> Self {
        Self {
            stack: Mutex::new(vec![initial]),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Route>>, NavigationError> {
        self.stack.lock().map_err(|_| NavigationError::Detached)
    }

    /// Full history, oldest first.
    pub fn history(&self) -> Vec<Route> {
        self.lock().map(|stack| stack.clone()).unwrap_or_default()
    }

    /// Pop the current entry. Returns the new current route, if any remains.
    pub fn back(&self) -> Option<Route> {
        let mut stack = self.lock().ok()?;
        if stack.len() > 1 {
            stack.pop();
        }
        stack.last().cloned()
    }
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}

impl Navigator for HistoryNavigator {
    fn current(&self) -> Route {
        self.lock()
            .ok()
            .and_then(|stack| stack.last().cloned())
            .unwrap_or(Route::Home)
    }

    fn push(&self, route: Route) -> Result<(), NavigationError> {
        self.lock()?.push(route);
        Ok(())
    }

    fn replace(&self, route: Route) -> Result<(), NavigationError> {
        let mut stack = self.lock()?;
        match stack.last_mut() {
            Some(top) => *top = route,
            None => stack.push(route),
        }
        Ok(())
    }
}

/// Sends an authenticated user to their role's dashboard.
#[derive(Clone)]
pub struct DashboardRedirect {
    navigator: Arc<dyn Navigator>,
}

impl DashboardRedirect {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }

    /// Replace-navigate to the resolved dashboard, if one resolves and the
    /// current route is a landing route (see [`Route::is_landing`]).
    ///
    /// Loading and signed-out states do nothing, and neither does a user who
    /// already moved on to a quiz or study page. Re-running with the same
    /// state navigates to the same place again.
    pub fn evaluate(&self, auth: &AuthState) -> Result<Option<Route>, NavigationError> {
        let Some(route) = resolve_dashboard(auth) else {
            return Ok(None);
        };
        let current = self.navigator.current();
        if !current.is_landing() {
            tracing::trace!(current = %current, "Dashboard redirect skipped off landing routes");
            return Ok(None);
        }
        self.navigator.replace(route.clone())?;
        tracing::debug!(route = %route, "Redirected to dashboard");
        Ok(Some(route))
    }
}

/// Re-run the dashboard redirect on every session change.
///
/// The current value is evaluated immediately. The task ends when the handle
/// is dropped or shut down, or when the session store goes away.
pub fn spawn_dashboard_redirect(
    mut session_rx: watch::Receiver<AuthState>,
    navigator: Arc<dyn Navigator>,
) -> BackgroundTask {
    let redirect = DashboardRedirect::new(navigator);
    BackgroundTask::spawn("dashboard_redirect", move |mut shutdown_rx| async move {
        loop {
            let auth = session_rx.borrow_and_update().clone();
            if let Err(err) = redirect.evaluate(&auth) {
                tracing::warn!(error = %err, "Dashboard redirect failed");
            }

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Session store closed, stopping dashboard redirect");
                        break;
                    }
                }
            }
        }
    })
}

/// Gatekeeper for protected routes.
#[derive(Clone)]
pub struct RouteGuard {
    navigator: Arc<dyn Navigator>,
}

impl RouteGuard {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }

    /// Decide whether `route` may be shown.
    pub fn check(&self, route: &Route, auth: &AuthState) -> GuardDecision {
        check_access(route, auth)
    }

    /// Navigate to `route`, or to wherever the guard sends the visitor instead.
    pub fn navigate(&self, route: Route, auth: &AuthState) -> Result<GuardDecision, NavigationError> {
        let decision = self.check(&route, auth);
        match &decision {
            GuardDecision::Allow => self.navigator.push(route)?,
            GuardDecision::Redirect(target) => {
                tracing::debug!(requested = %route, target = %target, "Route guard redirect");
                self.navigator.replace(target.clone())?;
            }
            GuardDecision::Pending => {}
        }
        Ok(decision)
    }
}
