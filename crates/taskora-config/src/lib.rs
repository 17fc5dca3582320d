//! # Taskora Configuration
//!
//! Typed configuration for the Taskora query layer and the serverless-style
//! functions service.
//!
//! Configuration is resolved in three steps:
//!
//! 1. Hardcoded defaults (every component implements [`Default`])
//! 2. An optional TOML file
//! 3. `TASKORA_*` environment variables
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use taskora_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load(Some("taskora.toml")).await?;
//!     let ttl = config.cache.ttl();
//!     # let _ = ttl;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod components;
mod config;
mod error;
mod loader;

pub use components::*;
pub use config::{Environment, LoggingConfig, TaskoraConfig};
pub use error::ConfigError;
pub use loader::{ConfigLoader, ENV_PREFIX};
