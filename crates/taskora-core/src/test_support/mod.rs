//! Test support
//!
//! In-memory implementations of the query layer's collaborators, used by this
//! crate's tests and by downstream crates that need a [`crate::DataBackend`]
//! without a network.

pub mod memory;

pub use memory::{MemoryBackend, MemoryBackendStats};
