//! Row and payload types shared by every layer

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single row as returned by the data platform
pub type Row = serde_json::Map<String, Value>;

/// Rows plus the optional exact total
///
/// `count` is only present when the query asked for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPayload {
    pub rows: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl QueryPayload {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows, count: None }
    }

    #[must_use]
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build a [`Row`] from a `serde_json::json!` object literal
///
/// Non-object values produce an empty row.
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}
