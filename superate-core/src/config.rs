//! Client configuration.
//!
//! Endpoints and provider credentials come from a TOML file. Both the
//! development and the production endpoint sets live in the file; the
//! `environment` flag (overridable with `SUPERATE_ENVIRONMENT`) picks one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

use crate::redact::REDACTED;
use crate::ConfigError;

/// Default minimum interval between activity writes (5 minutes).
pub const DEFAULT_HEARTBEAT_COOLDOWN_SECS: u64 = 300;

/// Default interval of the cache garbage-collection sweep.
pub const DEFAULT_CACHE_GC_INTERVAL_SECS: u64 = 60;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = std::convert::Infallible;

    /// Parse an environment name (case-insensitive); anything but production is development.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        })
    }
}

/// Backend endpoints for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub data_api_url: String,
    pub auth_url: String,
    pub ai_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointSets {
    pub development: EndpointConfig,
    pub production: EndpointConfig,
}

/// Credentials for the backend-as-a-service provider.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: SecretString,
    pub project_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &REDACTED)
            .field("project_id", &self.project_id)
            .finish()
    }
}

fn deserialize_secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(SecretString::new(raw.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeartbeatSettings {
    pub cooldown_secs: u64,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: DEFAULT_HEARTBEAT_COOLDOWN_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    pub gc_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            gc_interval_secs: DEFAULT_CACHE_GC_INTERVAL_SECS,
        }
    }
}

/// Master client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuperateConfig {
    #[serde(default)]
    pub environment: Environment,
    pub endpoints: EndpointSets,
    pub credentials: Credentials,
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub heartbeat: HeartbeatSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

impl SuperateConfig {
    /// Load from the path given by `--config` or `SUPERATE_CONFIG`, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        tracing::debug!(path = %path.display(), "Loading configuration");
        let mut config = Self::from_path(&path)?;
        if let Ok(value) = std::env::var("SUPERATE_ENVIRONMENT") {
            // Infallible parse.
            config.environment = value.parse().unwrap_or_default();
            tracing::info!(
                environment = ?config.environment,
                "Environment overridden by SUPERATE_ENVIRONMENT"
            );
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: SuperateConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Endpoints selected by the environment flag.
    pub fn active_endpoints(&self) -> &EndpointConfig {
        match self.environment {
            Environment::Development => &self.endpoints.development,
            Environment::Production => &self.endpoints.production,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn heartbeat_cooldown(&self) -> Duration {
        Duration::from_secs(self.heartbeat.cooldown_secs)
    }

    pub fn cache_gc_interval(&self) -> Duration {
        Duration::from_secs(self.cache.gc_interval_secs)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - every endpoint URL of both environments is non-empty and http(s)
    /// - the API key and project id are present
    /// - all durations are positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (env, endpoints) in [
            ("development", &self.endpoints.development),
            ("production", &self.endpoints.production),
        ] {
            validate_url(env, "data_api_url", &endpoints.data_api_url)?;
            validate_url(env, "auth_url", &endpoints.auth_url)?;
            validate_url(env, "ai_url", &endpoints.ai_url)?;
        }

        if self.credentials.api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "credentials.api_key".to_string(),
            });
        }
        if self.credentials.project_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "credentials.project_id".to_string(),
            });
        }

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.heartbeat.cooldown_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "heartbeat.cooldown_secs".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache.gc_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.gc_interval_secs".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

fn validate_url(env: &str, field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: format!("endpoints.{}.{}", env, field),
            value: value.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidValue {
            field: format!("endpoints.{}.{}", env, field),
            value: value.to_string(),
            reason: "must be an http(s) URL".to_string(),
        });
    }
    Ok(())
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("SUPERATE_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
