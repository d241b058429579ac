//! Error types for the client runtime.

use superate_core::{ConfigError, SuperateError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid header value for {header}: {reason}")]
    InvalidHeader { header: &'static str, reason: String },
    #[error("Failed to initialize logging: {reason}")]
    Telemetry { reason: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Superate(#[from] SuperateError),
}

pub type ClientResult<T> = Result<T, ClientError>;
