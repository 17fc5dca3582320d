//! Errors raised while constructing a REST transport

use taskora_config::ConfigError;
use taskora_core::BackendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestError {
    #[error("Invalid backend configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl From<RestError> for BackendError {
    fn from(err: RestError) -> Self {
        BackendError::Configuration(err.to_string())
    }
}
