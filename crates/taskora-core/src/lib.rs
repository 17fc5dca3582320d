//! Taskora query layer
//!
//! Client-side read path over the hosted data platform:
//!
//! - [`filter`] - declarative filters and their translation into predicates
//! - [`signature`] - canonical, order-independent query keys
//! - [`cache`] - TTL cache of query results with per-table invalidation
//! - [`backend`] - the [`DataBackend`] trait implemented by transports
//! - [`executor`] - the single read entry point, plus invalidating writes
//! - [`accessors`] - fixed per-entity query presets
//! - [`pagination`] - discrete and infinite-scroll paging
//! - [`debounce`] - quiet-window scheduling for search-driven queries
//!
//! ```ignore
//! use std::sync::Arc;
//! use taskora_core::{FilterDescriptor, QueryCache, QueryExecutor, QueryOptions};
//!
//! let executor = QueryExecutor::new(backend, Arc::new(QueryCache::default()));
//! let result = executor
//!     .fetch(
//!         "briefs",
//!         QueryOptions::default()
//!             .filters(FilterDescriptor::new().eq("category", "design"))
//!             .limit(10),
//!     )
//!     .await;
//! ```

pub mod accessors;
pub mod backend;
pub mod cache;
pub mod debounce;
pub mod error;
pub mod executor;
pub mod filter;
pub mod pagination;
pub mod signature;
pub mod test_support;
pub mod types;

pub use accessors::{AccessOptions, Accessors, EntityPreset, PlatformStats};
pub use backend::{DataBackend, Ordering, RowRange, SelectRequest, SortDirection};
pub use cache::{CacheStats, QueryCache, DEFAULT_TTL};
pub use debounce::Debouncer;
pub use error::{BackendError, BackendResult, FilterError, QueryError};
pub use executor::{QueryExecutor, QueryOptions, QueryResult};
pub use filter::{
    translate, Condition, FilterDescriptor, FilterOp, FilterValue, Predicate, PredicateKind,
    TablePredicates, DISJUNCTION_KEY,
};
pub use pagination::{LoadState, PageOutcome, PageSnapshot, Paginator};
pub use signature::QuerySignature;
pub use types::{QueryPayload, Row};
