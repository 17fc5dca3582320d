//! Query-string rendering
//!
//! Renders translated predicates into the REST data API's operator syntax:
//!
//! | predicate | parameter |
//! |---|---|
//! | equality | `field=eq.value` |
//! | membership | `field=in.(a,b)` |
//! | range | `field=gte.value`, `field=lte.value` |
//! | pattern | `field=like.pat`, `field=ilike.pat` |
//! | OR group | `or=(a.eq.1,b.eq.2)` |
//!
//! Values inside `in.(...)` lists and OR groups are double-quoted when they
//! contain characters the API reserves for its own grammar.

use serde_json::Value;
use taskora_core::{Predicate, PredicateKind, SelectRequest, TablePredicates};

/// Characters with meaning inside lists and logic groups
const RESERVED: &[char] = &[',', '.', ':', '(', ')', '"', '\\', ' '];

/// Render a scalar the way the API expects it in a parameter value
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn quoted(value: &Value) -> String {
    let raw = render_value(value);
    if raw.contains(RESERVED) {
        format!(
            "\"{}\"",
            raw.replace('\\', "\\\\").replace('"', "\\\"")
        )
    } else {
        raw
    }
}

/// `op.value` half of a predicate
///
/// `nested` quotes the value for use inside an OR group.
fn operator_expr(kind: &PredicateKind, nested: bool) -> String {
    let scalar = |v: &Value| if nested { quoted(v) } else { render_value(v) };

    match kind {
        PredicateKind::Eq(v) => format!("eq.{}", scalar(v)),
        PredicateKind::Gte(v) => format!("gte.{}", scalar(v)),
        PredicateKind::Lte(v) => format!("lte.{}", scalar(v)),
        PredicateKind::Like(p) => format!("like.{}", scalar(&Value::String(p.clone()))),
        PredicateKind::ILike(p) => format!("ilike.{}", scalar(&Value::String(p.clone()))),
        PredicateKind::In(values) => {
            let items: Vec<String> = values.iter().map(quoted).collect();
            format!("in.({})", items.join(","))
        }
    }
}

/// Render one predicate as a `(field, "op.value")` pair
pub fn render_predicate(predicate: &Predicate) -> (String, String) {
    (predicate.field.clone(), operator_expr(&predicate.kind, false))
}

/// Render an OR group as the value of the `or` parameter
pub fn render_disjunction(any: &[Predicate]) -> Option<String> {
    if any.is_empty() {
        return None;
    }
    let members: Vec<String> = any
        .iter()
        .map(|p| format!("{}.{}", p.field, operator_expr(&p.kind, true)))
        .collect();
    Some(format!("({})", members.join(",")))
}

/// Filter parameters for a table handle, used by reads and writes alike
pub fn filter_params(target: &TablePredicates) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = target.all.iter().map(render_predicate).collect();
    if let Some(group) = render_disjunction(&target.any) {
        params.push(("or".to_string(), group));
    }
    params
}

/// Full parameter list of a read: projection, filters, ordering
///
/// The row window travels in the `Range` header, not here.
pub fn select_params(request: &SelectRequest) -> Vec<(String, String)> {
    let columns = match request.column_list() {
        Some(columns) => columns.join(","),
        None => "*".to_string(),
    };

    let mut params = vec![("select".to_string(), columns)];
    params.extend(filter_params(&request.predicates));
    if let Some(order) = &request.order {
        params.push((
            "order".to_string(),
            format!("{}.{}", order.column, order.direction.as_str()),
        ));
    }
    params
}
