//! Top-level configuration

use crate::components::{
    BackendConfig, CacheConfig, EmailConfig, PaginationConfig, PasswordResetConfig,
    PaymentsConfig, SearchConfig, ServerConfig,
};
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Deployment environment
///
/// Controls environment-dependent behaviour such as the backend transport
/// timeout, which only applies in production.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development: no transport timeout
    #[default]
    Development,
    /// Production deployment
    Production,
}

impl Environment {
    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::invalid("environment", other)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Complete Taskora configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskoraConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Hosted data platform
    pub backend: BackendConfig,
    /// Query cache
    pub cache: CacheConfig,
    /// Pagination defaults
    pub pagination: PaginationConfig,
    /// Search input debouncing
    pub search: SearchConfig,
    /// Functions HTTP server
    pub server: ServerConfig,
    /// Outbound email
    pub email: EmailConfig,
    /// Payment gateway
    pub payments: PaymentsConfig,
    /// Password reset flow
    pub password_reset: PasswordResetConfig,
    /// Logging
    pub logging: LoggingConfig,
}

impl TaskoraConfig {
    /// Transport timeout for backend requests
    ///
    /// Bounded in production, unbounded during local development.
    pub fn backend_timeout(&self) -> Option<Duration> {
        if self.environment.is_production() {
            Some(Duration::from_secs(self.backend.request_timeout_seconds))
        } else {
            None
        }
    }

    /// Check value ranges
    ///
    /// Missing credentials are not checked here; they are reported by the
    /// component accessors at the point they are needed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.ttl_seconds == 0 {
            return Err(ConfigError::invalid("cache.ttl_seconds", 0));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::invalid("cache.max_entries", 0));
        }
        if self.payments.timeout_seconds == 0 {
            return Err(ConfigError::invalid("payments.timeout_seconds", 0));
        }
        if self.pagination.default_page_size == 0 {
            return Err(ConfigError::invalid("pagination.default_page_size", 0));
        }
        if self.backend.request_timeout_seconds == 0 {
            return Err(ConfigError::invalid("backend.request_timeout_seconds", 0));
        }
        if self.password_reset.token_ttl_minutes == 0 {
            return Err(ConfigError::invalid("password_reset.token_ttl_minutes", 0));
        }
        if let Some(url) = &self.backend.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::invalid("backend.url", url));
            }
        }
        Ok(())
    }
}
