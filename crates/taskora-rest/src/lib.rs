//! REST transport for the Taskora query layer
//!
//! [`RestBackend`] implements [`taskora_core::DataBackend`] against the hosted
//! platform's REST data API. Filter predicates are rendered by [`render`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskora_config::TaskoraConfig;
//! use taskora_core::QueryExecutor;
//! use taskora_rest::RestBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TaskoraConfig::default();
//! let backend = RestBackend::from_config(&config)?;
//! let executor = QueryExecutor::from_config(Arc::new(backend), &config);
//! # let _ = executor;
//! # Ok(())
//! # }
//! ```

mod admin;
mod client;
mod error;
pub mod render;

pub use client::{parse_content_range, RestBackend};
pub use error::RestError;
