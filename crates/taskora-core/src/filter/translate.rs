//! Filter translation
//!
//! Turns a [`FilterDescriptor`] into the predicate plan transports render
//! (query-string operators for the REST API, direct evaluation for the
//! in-memory backend). Translation is pure and infallible: every operator is
//! known at compile time, and unset conditions are dropped here.

use super::{FilterDescriptor, FilterOp, FilterValue};
use crate::types::Row;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

/// A single backend predicate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub field: String,
    pub kind: PredicateKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum PredicateKind {
    Eq(Value),
    In(Vec<Value>),
    Gte(Value),
    Lte(Value),
    Like(String),
    #[serde(rename = "ilike")]
    ILike(String),
}

/// A table handle with its predicates applied
///
/// `all` predicates are AND-combined. `any` is a single OR group, AND-combined
/// with `all`; an empty group imposes nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TablePredicates {
    pub table: String,
    pub all: Vec<Predicate>,
    pub any: Vec<Predicate>,
}

impl TablePredicates {
    /// A handle on `table` with no predicates
    pub fn unfiltered(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }

    /// Evaluate against a row
    pub fn matches(&self, row: &Row) -> bool {
        self.all.iter().all(|p| p.matches(row))
            && (self.any.is_empty() || self.any.iter().any(|p| p.matches(row)))
    }
}

/// Translate `filters` into predicates on `table`
///
/// Conditions are visited in field order. Unset conditions (null, empty
/// string, empty list) emit nothing.
pub fn translate(table: &str, filters: &FilterDescriptor) -> TablePredicates {
    let all = filters
        .conditions()
        .filter_map(|(field, value)| to_predicate(field, value))
        .collect();

    let any = filters
        .disjunction()
        .iter()
        .filter_map(|c| to_predicate(&c.field, &c.value))
        .collect();

    TablePredicates {
        table: table.to_string(),
        all,
        any,
    }
}

fn to_predicate(field: &str, value: &FilterValue) -> Option<Predicate> {
    if value.is_unset() {
        return None;
    }

    let kind = match value {
        FilterValue::OneOf(values) => PredicateKind::In(values.clone()),
        FilterValue::Equals(v) => PredicateKind::Eq(v.clone()),
        FilterValue::Compare(op, v) => match op {
            FilterOp::Eq => PredicateKind::Eq(v.clone()),
            FilterOp::Gte => PredicateKind::Gte(v.clone()),
            FilterOp::Lte => PredicateKind::Lte(v.clone()),
            FilterOp::Like => PredicateKind::Like(pattern_text(v)),
            FilterOp::Ilike => PredicateKind::ILike(pattern_text(v)),
        },
    };

    Some(Predicate {
        field: field.to_string(),
        kind,
    })
}

fn pattern_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Predicate {
    /// Evaluate against a row; a missing field never matches
    pub fn matches(&self, row: &Row) -> bool {
        let Some(actual) = row.get(&self.field) else {
            return false;
        };

        match &self.kind {
            PredicateKind::Eq(expected) => values_equal(actual, expected),
            PredicateKind::In(options) => options.iter().any(|o| values_equal(actual, o)),
            PredicateKind::Gte(bound) => {
                matches!(compare_values(actual, bound), Some(Ordering::Greater | Ordering::Equal))
            }
            PredicateKind::Lte(bound) => {
                matches!(compare_values(actual, bound), Some(Ordering::Less | Ordering::Equal))
            }
            PredicateKind::Like(pattern) => actual
                .as_str()
                .is_some_and(|text| like_match(pattern, text)),
            PredicateKind::ILike(pattern) => actual.as_str().is_some_and(|text| {
                like_match(&pattern.to_lowercase(), &text.to_lowercase())
            }),
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordering between two scalar JSON values of the same kind
///
/// Strings compare lexicographically, which orders ISO-8601 timestamps
/// correctly. Mixed kinds are incomparable.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// SQL `LIKE` semantics: `%` matches any run, `_` matches one character
pub(crate) fn like_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    // matched[j]: pattern[..i] matches text[..j]
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;

    for &p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= matched[j];
                    next[j] = seen;
                }
            }
            _ => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1] && (p == '_' || p == text[j - 1]);
                }
            }
        }
        matched = next;
    }

    matched[text.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Condition;
    use crate::types::row;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_null_filter_emits_no_predicate() {
        let with_null = FilterDescriptor::new()
            .eq("category", "design")
            .with("deadline", FilterValue::Equals(Value::Null));
        let without = FilterDescriptor::new().eq("category", "design");

        assert_eq!(translate("briefs", &with_null), translate("briefs", &without));
        assert_eq!(translate("briefs", &with_null).all.len(), 1);
    }

    #[test]
    fn test_empty_string_and_list_skipped() {
        let filters = FilterDescriptor::new()
            .eq("search", "")
            .one_of::<&str>("status", vec![]);

        assert!(translate("briefs", &filters).is_unfiltered());
    }

    #[test]
    fn test_ilike_on_title() {
        let filters = FilterDescriptor::from_json(&json!({
            "title": { "operator": "ilike", "value": "%test%" }
        }))
        .unwrap();

        let plan = translate("briefs", &filters);
        assert_eq!(
            plan.all,
            vec![Predicate {
                field: "title".to_string(),
                kind: PredicateKind::ILike("%test%".to_string()),
            }]
        );

        assert!(plan.matches(&row(json!({ "title": "Logo TEST for NGO" }))));
        assert!(plan.matches(&row(json!({ "title": "a testing brief" }))));
        assert!(!plan.matches(&row(json!({ "title": "Landing page" }))));
    }

    #[test]
    fn test_list_becomes_membership() {
        let plan = translate(
            "contracts",
            &FilterDescriptor::new().one_of("status", vec!["active", "completed"]),
        );

        assert_eq!(
            plan.all[0].kind,
            PredicateKind::In(vec![json!("active"), json!("completed")])
        );
        assert!(plan.matches(&row(json!({ "status": "completed" }))));
        assert!(!plan.matches(&row(json!({ "status": "cancelled" }))));
    }

    #[test]
    fn test_range_predicates() {
        let plan = translate(
            "briefs",
            &FilterDescriptor::new().gte("budget", 100).lte("budget_max", 500),
        );

        assert!(plan.matches(&row(json!({ "budget": 100, "budget_max": 500 }))));
        assert!(!plan.matches(&row(json!({ "budget": 99.5, "budget_max": 200 }))));
        assert!(!plan.matches(&row(json!({ "budget": 300, "budget_max": 501 }))));
    }

    #[test]
    fn test_disjunction_and_conjunction() {
        let filters = FilterDescriptor::new()
            .eq("archived", false)
            .any_of(vec![
                Condition::eq("client_id", "u1"),
                Condition::eq("provider_id", "u1"),
            ]);
        let plan = translate("conversations", &filters);

        assert_eq!(plan.any.len(), 2);
        assert!(plan.matches(&row(json!({ "archived": false, "client_id": "u1", "provider_id": "u2" }))));
        assert!(plan.matches(&row(json!({ "archived": false, "client_id": "u3", "provider_id": "u1" }))));
        assert!(!plan.matches(&row(json!({ "archived": true, "client_id": "u1" }))));
        assert!(!plan.matches(&row(json!({ "archived": false, "client_id": "u3", "provider_id": "u4" }))));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let plan = translate("users", &FilterDescriptor::new().eq("role", "ngo"));
        assert!(!plan.matches(&row(json!({ "id": "u1" }))));
    }

    #[test_case("%test%", "my test case", true ; "substring")]
    #[test_case("test%", "testing", true ; "prefix")]
    #[test_case("%ing", "testing", true ; "suffix")]
    #[test_case("t_st", "test", true ; "single char")]
    #[test_case("t_st", "toast", false ; "single char mismatch")]
    #[test_case("Test", "test", false ; "case sensitive")]
    #[test_case("%", "", true ; "empty text")]
    #[test_case("a%b%c", "aXXbYYc", true ; "multiple wildcards")]
    fn test_like_match(pattern: &str, text: &str, expected: bool) {
        assert_eq!(like_match(pattern, text), expected);
    }

    #[test]
    fn test_compare_timestamps_as_strings() {
        assert_eq!(
            compare_values(&json!("2024-03-01T00:00:00Z"), &json!("2024-02-28T23:59:59Z")),
            Some(Ordering::Greater)
        );
        assert_eq!(compare_values(&json!(1), &json!("1")), None);
    }
}
