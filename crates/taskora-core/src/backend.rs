//! Backend data interface
//!
//! The query layer never talks to the network itself. Transports implement
//! [`DataBackend`]; the REST adapter lives in `taskora-rest` and an in-memory
//! implementation in [`crate::test_support`].

use crate::error::BackendResult;
use crate::filter::TablePredicates;
use crate::types::{QueryPayload, Row};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ordering {
    pub column: String,
    pub direction: SortDirection,
}

/// Row window: `offset` is the inclusive start, `limit` bounds the row count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowRange {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl RowRange {
    /// Inclusive `(from, to)` bounds, as the `Range` header expects
    ///
    /// `None` when the range is unbounded.
    pub fn inclusive_bounds(&self) -> Option<(usize, usize)> {
        self.limit
            .filter(|limit| *limit > 0)
            .map(|limit| (self.offset, self.offset + limit - 1))
    }
}

/// A fully-specified read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectRequest {
    pub predicates: TablePredicates,
    /// Column projection, `*` for all columns
    pub columns: String,
    pub order: Option<Ordering>,
    pub range: RowRange,
    /// Ask for the exact total alongside the rows
    pub count: bool,
}

impl SelectRequest {
    pub fn table(&self) -> &str {
        &self.predicates.table
    }

    /// Individual projected columns, `None` for `*`
    pub fn column_list(&self) -> Option<Vec<&str>> {
        let columns: Vec<&str> = self
            .columns
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();

        if columns.is_empty() || columns.contains(&"*") {
            None
        } else {
            Some(columns)
        }
    }
}

/// Collection CRUD plus remote procedure calls on the hosted platform
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one instance is shared by every
/// query issued in the process.
#[async_trait]
pub trait DataBackend: Send + Sync {
    /// Read rows
    async fn select(&self, request: &SelectRequest) -> BackendResult<QueryPayload>;

    /// Insert rows into `table`, returning them as stored
    async fn insert(&self, table: &str, rows: Vec<Row>) -> BackendResult<Vec<Row>>;

    /// Merge `patch` into every matching row, returning the updated rows
    async fn update(&self, target: &TablePredicates, patch: Row) -> BackendResult<Vec<Row>>;

    /// Delete every matching row, returning the deleted rows
    async fn delete(&self, target: &TablePredicates) -> BackendResult<Vec<Row>>;

    /// Invoke a stored procedure
    async fn rpc(&self, function: &str, args: Value) -> BackendResult<Value>;
}

#[async_trait]
impl<T: DataBackend + ?Sized> DataBackend for std::sync::Arc<T> {
    async fn select(&self, request: &SelectRequest) -> BackendResult<QueryPayload> {
        (**self).select(request).await
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> BackendResult<Vec<Row>> {
        (**self).insert(table, rows).await
    }

    async fn update(&self, target: &TablePredicates, patch: Row) -> BackendResult<Vec<Row>> {
        (**self).update(target, patch).await
    }

    async fn delete(&self, target: &TablePredicates) -> BackendResult<Vec<Row>> {
        (**self).delete(target).await
    }

    async fn rpc(&self, function: &str, args: Value) -> BackendResult<Value> {
        (**self).rpc(function, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inclusive_bounds() {
        let range = RowRange {
            offset: 20,
            limit: Some(10),
        };
        assert_eq!(range.inclusive_bounds(), Some((20, 29)));
        assert_eq!(RowRange::default().inclusive_bounds(), None);
    }

    #[test]
    fn test_column_list() {
        let mut request = SelectRequest {
            predicates: TablePredicates::unfiltered("users"),
            columns: "*".to_string(),
            order: None,
            range: RowRange::default(),
            count: false,
        };
        assert_eq!(request.column_list(), None);

        request.columns = "id, email ,role".to_string();
        assert_eq!(request.column_list(), Some(vec!["id", "email", "role"]));
    }
}
