//! Error types for Supérate.IA client operations

use std::time::Duration;
use thiserror::Error;

/// Backend service failures.
///
/// Every backend call answers with a success/failure envelope; failures end
/// up here, along with transport problems reaching the backend at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Backend rejected {operation}: {message}")]
    Rejected {
        operation: String,
        code: Option<String>,
        message: String,
    },

    #[error("Quota exceeded for {operation}")]
    QuotaExceeded { operation: String },

    #[error("Transport failure for {operation}: {reason}")]
    Transport { operation: String, reason: String },

    #[error("Malformed response for {operation}: {reason}")]
    MalformedResponse { operation: String, reason: String },

    #[error("Not found: {resource} {id}")]
    NotFound { resource: String, id: String },
}

impl ServiceError {
    /// Build a rejection, promoting quota codes to [`ServiceError::QuotaExceeded`].
    pub fn rejected(
        operation: impl Into<String>,
        code: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        let operation = operation.into();
        let message = message.into();
        if is_quota_signal(code.as_deref(), &message) {
            return Self::QuotaExceeded { operation };
        }
        Self::Rejected {
            operation,
            code,
            message,
        }
    }

    /// Returns true when the backend refused the call because a quota ran out.
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            Self::QuotaExceeded { .. } => true,
            Self::Rejected { code, message, .. } => is_quota_signal(code.as_deref(), message),
            _ => false,
        }
    }
}

fn is_quota_signal(code: Option<&str>, message: &str) -> bool {
    if matches!(code, Some("resource-exhausted") | Some("quota-exceeded")) {
        return true;
    }
    let lowered = message.to_ascii_lowercase();
    lowered.contains("quota") || lowered.contains("resource-exhausted")
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown route: {path}")]
    UnknownRoute { path: String },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or SUPERATE_CONFIG)")]
    MissingConfigPath,

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Retention {retain_for:?} shorter than freshness {fresh_for:?}")]
    RetentionShorterThanFreshness {
        fresh_for: Duration,
        retain_for: Duration,
    },
}

/// Query cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache lock poisoned")]
    LockPoisoned,

    #[error("Failed to encode cached value for {key}: {reason}")]
    Encode { key: String, reason: String },
}

/// Navigation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Navigator is no longer attached")]
    Detached,
}

/// Master error type for all Supérate.IA client errors.
#[derive(Debug, Error)]
pub enum SuperateError {
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SuperateError {
    /// Returns true when this error is a backend quota refusal.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::Service(err) if err.is_quota_exceeded())
    }
}

/// Result type alias for Supérate.IA operations.
pub type SuperateResult<T> = Result<T, SuperateError>;

// =============================================================================
// TESTS
// =============================================================================
