//! Supérate.IA Core - Domain Types
//!
//! Roles, routes, sessions, quiz grouping, the backend result envelope,
//! log redaction and configuration. Every other crate depends on this one.

pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod quiz;
pub mod redact;
pub mod role;
pub mod route;
pub mod service;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CacheSettings, Credentials, EndpointConfig, EndpointSets, Environment, HeartbeatSettings,
    SuperateConfig, DEFAULT_CACHE_GC_INTERVAL_SECS, DEFAULT_HEARTBEAT_COOLDOWN_SECS,
};
pub use envelope::Envelope;
pub use error::{
    CacheError, ConfigError, NavigationError, ServiceError, SuperateError, SuperateResult,
    ValidationError,
};
pub use quiz::{
    detect_group_ranges, range_starting_at, shuffle_preserving_groups, shuffle_questions,
    GroupRange, Question,
};
pub use redact::{redact, LogSanitizer, REDACTED};
pub use role::Role;
pub use route::{check_access, GuardDecision, Route};
pub use service::{ActivityWriter, DataService};
pub use session::{resolve_dashboard, AuthState, Session, UserId};
