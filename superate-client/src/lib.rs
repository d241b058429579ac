//! Supérate.IA Client - Session Runtime
//!
//! Keeps the current session, sends users to their role's dashboard, guards
//! protected routes, rate-limits activity writes and serves cached data
//! queries over the REST backend.

pub mod app;
pub mod error;
pub mod heartbeat;
pub mod queries;
pub mod rest;
pub mod router;
pub mod session;
pub mod telemetry;

pub use app::AppServices;
pub use error::{ClientError, ClientResult};
pub use heartbeat::{
    spawn_heartbeat, Heartbeat, HeartbeatAction, HeartbeatHandle, HeartbeatState, Interaction,
};
pub use queries::{CollectionFetcher, DataQueries, DocumentFetcher};
pub use rest::RestDataService;
pub use router::{
    spawn_dashboard_redirect, DashboardRedirect, HistoryNavigator, Navigator, RouteGuard,
};
pub use session::SessionStore;
pub use telemetry::{init_logging, RedactingMakeWriter, DEFAULT_LOG_FILTER};
