//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or using configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::TaskoraConfig`]
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value outside its allowed range
    #[error("Invalid value for {field}: {value}")]
    InvalidValue {
        /// Dotted field name, e.g. `cache.ttl_seconds`
        field: String,
        /// Offending value or reason
        value: String,
    },

    /// A value required by the requested operation is not configured
    #[error("Missing required configuration: {0}")]
    MissingValue(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`]
    pub fn invalid(field: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Shorthand for [`ConfigError::MissingValue`]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingValue(field.into())
    }
}
