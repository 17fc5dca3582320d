//! Query executor
//!
//! The single entry point for reading a collection. Reads consult the
//! [`QueryCache`] first when caching is on; misses are translated, sent to the
//! [`DataBackend`] and stored on success. Failures are returned inside the
//! [`QueryResult`] and never cached.
//!
//! Writes go through the same executor so that every successful mutation
//! invalidates the cached reads of its table.

use crate::backend::{DataBackend, Ordering, RowRange, SelectRequest, SortDirection};
use crate::cache::QueryCache;
use crate::error::QueryError;
use crate::filter::{translate, FilterDescriptor};
use crate::signature::QuerySignature;
use crate::types::{QueryPayload, Row};
use serde_json::Value;
use std::sync::Arc;
use taskora_config::TaskoraConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default ordering column
pub const DEFAULT_ORDER_COLUMN: &str = "created_at";

/// Read configuration
///
/// Every field has a default; blank strings and zero limits fall back to
/// those defaults instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Column projection, `*` for all
    pub columns: String,
    pub filters: FilterDescriptor,
    pub order_by: String,
    pub direction: SortDirection,
    pub limit: Option<usize>,
    pub offset: usize,
    pub use_cache: bool,
    /// Request the exact total row count
    pub want_count: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            columns: "*".to_string(),
            filters: FilterDescriptor::default(),
            order_by: DEFAULT_ORDER_COLUMN.to_string(),
            direction: SortDirection::Descending,
            limit: None,
            offset: 0,
            use_cache: true,
            want_count: false,
        }
    }
}

impl QueryOptions {
    #[must_use]
    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: FilterDescriptor) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = column.into();
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    #[must_use]
    pub fn want_count(mut self, want_count: bool) -> Self {
        self.want_count = want_count;
        self
    }

    /// Build the backend request for `table`
    pub fn to_request(&self, table: &str) -> SelectRequest {
        let columns = if self.columns.trim().is_empty() {
            "*".to_string()
        } else {
            self.columns.clone()
        };
        let order_column = if self.order_by.trim().is_empty() {
            DEFAULT_ORDER_COLUMN.to_string()
        } else {
            self.order_by.clone()
        };

        SelectRequest {
            predicates: translate(table, &self.filters),
            columns,
            order: Some(Ordering {
                column: order_column,
                direction: self.direction,
            }),
            range: RowRange {
                offset: self.offset,
                limit: self.limit.filter(|l| *l > 0),
            },
            count: self.want_count,
        }
    }
}

/// Outcome of a read
///
/// On failure `payload` is empty and `error` is set.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub payload: Arc<QueryPayload>,
    pub error: Option<QueryError>,
    /// Served from the cache without a backend call
    pub from_cache: bool,
}

impl QueryResult {
    fn success(payload: Arc<QueryPayload>, from_cache: bool) -> Self {
        Self {
            payload,
            error: None,
            from_cache,
        }
    }

    fn failure(error: QueryError) -> Self {
        Self {
            payload: Arc::new(QueryPayload::default()),
            error: Some(error),
            from_cache: false,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.payload.rows
    }

    pub fn count(&self) -> Option<u64> {
        self.payload.count
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into a `Result` for `?`-style callers
    pub fn into_result(self) -> Result<Arc<QueryPayload>, QueryError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.payload),
        }
    }
}

/// Cached reads and invalidating writes over a [`DataBackend`]
pub struct QueryExecutor {
    backend: Arc<dyn DataBackend>,
    cache: Arc<QueryCache>,
    caching_enabled: bool,
}

impl QueryExecutor {
    pub fn new(backend: Arc<dyn DataBackend>, cache: Arc<QueryCache>) -> Self {
        Self {
            backend,
            cache,
            caching_enabled: true,
        }
    }

    /// Executor with a fresh cache sized from configuration
    pub fn from_config(backend: Arc<dyn DataBackend>, config: &TaskoraConfig) -> Self {
        Self::new(backend, Arc::new(QueryCache::from_config(&config.cache)))
            .with_caching(config.cache.enabled)
    }

    /// Globally enable or disable caching; disabled behaves as `use_cache = false`
    #[must_use]
    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.caching_enabled = enabled;
        self
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn backend(&self) -> &Arc<dyn DataBackend> {
        &self.backend
    }

    /// Read `table`
    pub async fn fetch(&self, table: &str, options: QueryOptions) -> QueryResult {
        self.fetch_cancellable(table, options, &CancellationToken::new())
            .await
    }

    /// Read `table`, abandoning the request if `token` is cancelled first
    ///
    /// A cancelled read resolves to [`QueryError::Cancelled`] and is never
    /// stored.
    pub async fn fetch_cancellable(
        &self,
        table: &str,
        options: QueryOptions,
        token: &CancellationToken,
    ) -> QueryResult {
        let use_cache = options.use_cache && self.caching_enabled;
        let request = options.to_request(table);
        let signature = use_cache.then(|| QuerySignature::of(&request));

        if let Some(sig) = &signature {
            if let Some(payload) = self.cache.get(sig) {
                debug!(signature = %sig, rows = payload.len(), "Query cache hit");
                return QueryResult::success(payload, true);
            }
            debug!(signature = %sig, "Query cache miss");
        }

        if token.is_cancelled() {
            return QueryResult::failure(QueryError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => return QueryResult::failure(QueryError::Cancelled),
            outcome = self.backend.select(&request) => outcome,
        };

        match outcome {
            Ok(payload) => {
                let payload = Arc::new(payload);
                if let Some(sig) = signature {
                    self.cache.set(sig, Arc::clone(&payload));
                }
                QueryResult::success(payload, false)
            }
            Err(e) => {
                warn!(table, error = %e, "Query failed");
                QueryResult::failure(e.into())
            }
        }
    }

    /// Insert rows and invalidate the table's cached reads
    pub async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, QueryError> {
        let inserted = self.backend.insert(table, rows).await?;
        self.cache.invalidate(table);
        Ok(inserted)
    }

    /// Update matching rows and invalidate the table's cached reads
    ///
    /// An empty filter is rejected rather than patching the whole table.
    pub async fn update(
        &self,
        table: &str,
        filters: &FilterDescriptor,
        patch: Row,
    ) -> Result<Vec<Row>, QueryError> {
        let target = translate(table, filters);
        if target.is_unfiltered() {
            return Err(QueryError::UnfilteredMutation {
                operation: "update",
                table: table.to_string(),
            });
        }

        let updated = self.backend.update(&target, patch).await?;
        self.cache.invalidate(table);
        Ok(updated)
    }

    /// Delete matching rows and invalidate the table's cached reads
    ///
    /// An empty filter is rejected rather than clearing the whole table.
    pub async fn delete(
        &self,
        table: &str,
        filters: &FilterDescriptor,
    ) -> Result<Vec<Row>, QueryError> {
        let target = translate(table, filters);
        if target.is_unfiltered() {
            return Err(QueryError::UnfilteredMutation {
                operation: "delete",
                table: table.to_string(),
            });
        }

        let deleted = self.backend.delete(&target).await?;
        self.cache.invalidate(table);
        Ok(deleted)
    }

    /// Call a stored procedure, invalidating each table it writes to
    pub async fn rpc(
        &self,
        function: &str,
        args: Value,
        writes: &[&str],
    ) -> Result<Value, QueryError> {
        let result = self.backend.rpc(function, args).await?;
        for table in writes {
            self.cache.invalidate(table);
        }
        Ok(result)
    }
}
