//! In-memory [`DataBackend`]
//!
//! Evaluates predicates, ordering, ranges and projections over rows held in
//! memory, and records how often each operation ran so tests can assert on
//! backend round trips.
//!
//! # Examples
//!
//! ```rust
//! use serde_json::json;
//! use taskora_core::test_support::MemoryBackend;
//! use taskora_core::types::row;
//!
//! let backend = MemoryBackend::new()
//!     .with_table("briefs", vec![row(json!({ "id": "b1", "category": "design" }))]);
//!
//! assert_eq!(backend.rows("briefs").len(), 1);
//! assert_eq!(backend.stats().selects, 0);
//! ```

use crate::backend::{DataBackend, SelectRequest, SortDirection};
use crate::error::{BackendError, BackendResult};
use crate::filter::translate::compare_values;
use crate::filter::TablePredicates;
use crate::types::{QueryPayload, Row};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Tables by name
pub type Tables = HashMap<String, Vec<Row>>;

type LatencyFn = Arc<dyn Fn(&SelectRequest) -> Duration + Send + Sync>;
type RpcHandler = Arc<dyn Fn(&mut Tables, Value) -> BackendResult<Value> + Send + Sync>;

/// Operation counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryBackendStats {
    pub selects: usize,
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
    pub rpcs: usize,
}

#[derive(Default)]
struct MemoryState {
    tables: Tables,
    stats: MemoryBackendStats,
    fail_next: Option<BackendError>,
    next_id: u64,
    rpc: HashMap<String, RpcHandler>,
}

/// Observable in-memory backend with error injection
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    latency: Arc<Mutex<Option<LatencyFn>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: seed a table
    #[must_use]
    pub fn with_table(self, table: &str, rows: Vec<Row>) -> Self {
        self.seed(table, rows);
        self
    }

    /// Append rows to a table without counting an insert
    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        self.state
            .lock()
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Current contents of a table
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .lock()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn stats(&self) -> MemoryBackendStats {
        self.state.lock().stats.clone()
    }

    /// Make the next operation fail with `error`
    pub fn fail_next(&self, error: BackendError) {
        self.state.lock().fail_next = Some(error);
    }

    /// Delay every select by a duration chosen per request
    pub fn set_latency<F>(&self, latency: F)
    where
        F: Fn(&SelectRequest) -> Duration + Send + Sync + 'static,
    {
        *self.latency.lock() = Some(Arc::new(latency));
    }

    /// Register a stored procedure; the handler runs with the tables locked
    pub fn register_rpc<F>(&self, function: &str, handler: F)
    where
        F: Fn(&mut Tables, Value) -> BackendResult<Value> + Send + Sync + 'static,
    {
        self.state
            .lock()
            .rpc
            .insert(function.to_string(), Arc::new(handler));
    }
}

fn order_rows(rows: &mut [Row], column: &str, direction: SortDirection) {
    rows.sort_by(|a, b| match (a.get(column), b.get(column)) {
        (Some(x), Some(y)) if !x.is_null() && !y.is_null() => {
            let ord = type_rank(x)
                .cmp(&type_rank(y))
                .then_with(|| compare_values(x, y).unwrap_or(Ordering::Equal));
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        }
        // Nulls and missing values sort last in both directions
        (Some(x), _) if !x.is_null() => Ordering::Less,
        (_, Some(y)) if !y.is_null() => Ordering::Greater,
        _ => Ordering::Equal,
    });
}

/// Values of different JSON types order by type: bool, number, string, array, object
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn project(row: Row, columns: Option<&[&str]>) -> Row {
    match columns {
        None => row,
        Some(columns) => row
            .into_iter()
            .filter(|(key, _)| columns.contains(&key.as_str()))
            .collect(),
    }
}

#[async_trait]
impl DataBackend for MemoryBackend {
    async fn select(&self, request: &SelectRequest) -> BackendResult<QueryPayload> {
        self.state.lock().stats.selects += 1;

        let latency = self.latency.lock().clone();
        if let Some(latency) = latency {
            tokio::time::sleep(latency(request)).await;
        }

        let mut state = self.state.lock();
        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }

        let mut matched: Vec<Row> = state
            .tables
            .get(request.table())
            .map(|rows| {
                rows.iter()
                    .filter(|r| request.predicates.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(state);

        if let Some(order) = &request.order {
            order_rows(&mut matched, &order.column, order.direction);
        }

        let total = matched.len() as u64;
        let columns = request.column_list();
        let rows = matched
            .into_iter()
            .skip(request.range.offset)
            .take(request.range.limit.unwrap_or(usize::MAX))
            .map(|r| project(r, columns.as_deref()))
            .collect();

        let payload = QueryPayload::new(rows);
        Ok(if request.count {
            payload.with_count(total)
        } else {
            payload
        })
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> BackendResult<Vec<Row>> {
        let mut state = self.state.lock();
        state.stats.inserts += 1;
        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }

        let mut stored = Vec::with_capacity(rows.len());
        for mut row in rows {
            if !row.contains_key("id") {
                state.next_id += 1;
                row.insert("id".to_string(), Value::String(format!("mem-{}", state.next_id)));
            }
            stored.push(row);
        }

        state
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn update(&self, target: &TablePredicates, patch: Row) -> BackendResult<Vec<Row>> {
        let mut state = self.state.lock();
        state.stats.updates += 1;
        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }

        let mut updated = Vec::new();
        if let Some(rows) = state.tables.get_mut(&target.table) {
            for row in rows.iter_mut().filter(|r| target.matches(r)) {
                for (key, value) in &patch {
                    row.insert(key.clone(), value.clone());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, target: &TablePredicates) -> BackendResult<Vec<Row>> {
        let mut state = self.state.lock();
        state.stats.deletes += 1;
        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }

        let mut deleted = Vec::new();
        if let Some(rows) = state.tables.get_mut(&target.table) {
            let (gone, kept): (Vec<Row>, Vec<Row>) =
                rows.drain(..).partition(|r| target.matches(r));
            *rows = kept;
            deleted = gone;
        }
        Ok(deleted)
    }

    async fn rpc(&self, function: &str, args: Value) -> BackendResult<Value> {
        let mut state = self.state.lock();
        state.stats.rpcs += 1;
        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }

        let handler = state
            .rpc
            .get(function)
            .cloned()
            .ok_or_else(|| BackendError::status(404, format!("function {function} not found")))?;
        handler(&mut state.tables, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Ordering as RowOrdering, RowRange};
    use crate::filter::{translate, FilterDescriptor};
    use crate::types::row;
    use serde_json::json;

    fn backend() -> MemoryBackend {
        MemoryBackend::new().with_table(
            "briefs",
            vec![
                row(json!({ "id": "b1", "category": "design", "created_at": "2024-01-01" })),
                row(json!({ "id": "b2", "category": "writing", "created_at": "2024-01-03" })),
                row(json!({ "id": "b3", "category": "design", "created_at": "2024-01-02" })),
                row(json!({ "id": "b4", "category": "design", "created_at": null })),
            ],
        )
    }

    fn select(filters: FilterDescriptor, range: RowRange, count: bool) -> SelectRequest {
        SelectRequest {
            predicates: translate("briefs", &filters),
            columns: "id".to_string(),
            order: Some(RowOrdering {
                column: "created_at".to_string(),
                direction: SortDirection::Descending,
            }),
            range,
            count,
        }
    }

    #[tokio::test]
    async fn test_select_filters_orders_and_projects() {
        let backend = backend();
        let payload = backend
            .select(&select(
                FilterDescriptor::new().eq("category", "design"),
                RowRange::default(),
                true,
            ))
            .await
            .unwrap();

        let ids: Vec<&Value> = payload.rows.iter().map(|r| &r["id"]).collect();
        assert_eq!(ids, vec![&json!("b3"), &json!("b1"), &json!("b4")]);
        assert_eq!(payload.count, Some(3));
        assert!(payload.rows.iter().all(|r| r.len() == 1));
        assert_eq!(backend.stats().selects, 1);
    }

    #[test]
    fn test_mixed_types_order_by_type_first() {
        let mut rows = vec![
            row(json!({ "id": "s", "v": "10" })),
            row(json!({ "id": "n2", "v": 2 })),
            row(json!({ "id": "none" })),
            row(json!({ "id": "b", "v": true })),
            row(json!({ "id": "n1", "v": 1 })),
        ];
        let ids = |rows: &[Row]| -> Vec<String> {
            rows.iter().map(|r| r["id"].as_str().unwrap().to_string()).collect()
        };

        order_rows(&mut rows, "v", SortDirection::Ascending);
        assert_eq!(ids(&rows), vec!["b", "n1", "n2", "s", "none"]);

        order_rows(&mut rows, "v", SortDirection::Descending);
        assert_eq!(ids(&rows), vec!["s", "n2", "n1", "b", "none"]);
    }

    #[tokio::test]
    async fn test_select_range() {
        let payload = backend()
            .select(&select(
                FilterDescriptor::new(),
                RowRange {
                    offset: 1,
                    limit: Some(2),
                },
                true,
            ))
            .await
            .unwrap();

        assert_eq!(payload.rows.len(), 2);
        assert_eq!(payload.rows[0]["id"], json!("b3"));
        assert_eq!(payload.count, Some(4));
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let backend = backend();
        backend.fail_next(BackendError::network("connection refused"));

        let request = select(FilterDescriptor::new(), RowRange::default(), false);
        assert!(backend.select(&request).await.is_err());
        assert!(backend.select(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_insert_update_delete() {
        let backend = backend();

        let inserted = backend
            .insert("briefs", vec![row(json!({ "category": "video" }))])
            .await
            .unwrap();
        assert_eq!(inserted[0]["id"], json!("mem-1"));

        let target = translate("briefs", &FilterDescriptor::new().eq("category", "design"));
        let updated = backend
            .update(&target, row(json!({ "status": "closed" })))
            .await
            .unwrap();
        assert_eq!(updated.len(), 3);

        let target = translate("briefs", &FilterDescriptor::new().eq("status", "closed"));
        let deleted = backend.delete(&target).await.unwrap();
        assert_eq!(deleted.len(), 3);
        assert_eq!(backend.rows("briefs").len(), 2);
    }

    #[tokio::test]
    async fn test_rpc_handler() {
        let backend = backend();
        backend.register_rpc("count_briefs", |tables, _args| {
            Ok(json!(tables.get("briefs").map(Vec::len).unwrap_or(0)))
        });

        assert_eq!(backend.rpc("count_briefs", json!({})).await.unwrap(), json!(4));
        assert!(matches!(
            backend.rpc("missing", json!({})).await,
            Err(BackendError::Status { status: 404, .. })
        ));
    }
}
