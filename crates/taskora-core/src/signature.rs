//! Canonical query signatures
//!
//! A [`QuerySignature`] keys the query cache. It is computed from the
//! translated request, not from the raw filter description, so
//!
//! - field insertion order never matters,
//! - an unset filter (`null`, `""`, `[]`) keys the same as an omitted one,
//! - the members of the OR group are order-independent.

use crate::backend::SelectRequest;
use crate::filter::{Predicate, PredicateKind};
use serde_json::Value;
use std::fmt;

/// `table:digest` cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuerySignature {
    table: String,
    digest: String,
}

impl QuerySignature {
    /// Compute the signature of a request
    pub fn of(request: &SelectRequest) -> Self {
        let canonical = canonical_form(request);
        Self {
            table: request.table().to_string(),
            digest: blake3::hash(canonical.as_bytes()).to_hex().to_string(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Whether this signature belongs to a table whose name starts with
    /// `prefix`
    pub fn matches_table_prefix(&self, prefix: &str) -> bool {
        self.table.starts_with(prefix)
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.digest)
    }
}

fn canonical_form(request: &SelectRequest) -> String {
    let columns = match request.column_list() {
        Some(mut columns) => {
            columns.sort_unstable();
            columns.dedup();
            columns.join(",")
        }
        None => "*".to_string(),
    };

    let order = request
        .order
        .as_ref()
        .map(|o| format!("{}.{}", o.column, o.direction.as_str()))
        .unwrap_or_default();

    format!(
        "table={}|columns={}|all={}|any={}|order={}|offset={}|limit={}|count={}",
        request.table(),
        columns,
        canonical_predicates(&request.predicates.all),
        canonical_predicates(&request.predicates.any),
        order,
        request.range.offset,
        request
            .range
            .limit
            .map(|l| l.to_string())
            .unwrap_or_default(),
        request.count,
    )
}

fn canonical_predicates(predicates: &[Predicate]) -> String {
    let mut parts: Vec<String> = predicates
        .iter()
        .map(|p| format!("{}:{}", p.field, canonical_kind(&p.kind)))
        .collect();
    parts.sort_unstable();
    parts.join("&")
}

/// Membership lists are sets: their order and duplicates are not significant
fn canonical_kind(kind: &PredicateKind) -> String {
    match kind {
        PredicateKind::In(values) => {
            let mut items: Vec<String> = values.iter().map(canonical_json).collect();
            items.sort_unstable();
            items.dedup();
            format!("{{\"op\":\"in\",\"value\":[{}]}}", items.join(","))
        }
        other => canonical_json(&serde_json::to_value(other).unwrap_or(Value::Null)),
    }
}

/// JSON text with object keys sorted at every depth
pub(crate) fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        scalar => scalar.to_string(),
    }
}
