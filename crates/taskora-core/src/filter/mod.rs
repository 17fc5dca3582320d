//! Declarative filters
//!
//! A [`FilterDescriptor`] maps field names to conditions:
//!
//! - a literal value is an equality test
//! - a list is a membership test
//! - an operator object `{ "operator": "gte", "value": 10 }` is a comparison
//!
//! The reserved [`DISJUNCTION_KEY`] holds conditions that are OR-combined with
//! each other and AND-combined with everything else.
//!
//! Descriptors are built either through the typed builder or from the JSON
//! shape pages send ([`FilterDescriptor::from_json`]). Either way they are
//! turned into predicates by [`translate`].

pub(crate) mod translate;

pub use translate::{translate, Predicate, PredicateKind, TablePredicates};

use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Reserved key holding the OR-combined condition group
pub const DISJUNCTION_KEY: &str = "or";

/// Comparison operators accepted in operator objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    /// Equality (`custom-equals` in the JSON form)
    Eq,
    /// Greater than or equal
    Gte,
    /// Less than or equal
    Lte,
    /// Case-sensitive pattern match (`%` and `_` wildcards)
    Like,
    /// Case-insensitive pattern match
    Ilike,
}

impl FilterOp {
    /// Parse a JSON operator name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "eq" | "equals" | "custom-equals" => Some(FilterOp::Eq),
            "gte" => Some(FilterOp::Gte),
            "lte" => Some(FilterOp::Lte),
            "like" => Some(FilterOp::Like),
            "ilike" => Some(FilterOp::Ilike),
            _ => None,
        }
    }

    /// Check if this operator is a pattern match
    pub fn is_pattern(&self) -> bool {
        matches!(self, FilterOp::Like | FilterOp::Ilike)
    }
}

/// The condition attached to one field
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// `field = value`
    Equals(Value),
    /// `field IN (values)`
    OneOf(Vec<Value>),
    /// `field <op> value`
    Compare(FilterOp, Value),
}

impl FilterValue {
    /// Unset conditions are skipped instead of producing an impossible
    /// predicate: null, empty string, empty list.
    pub fn is_unset(&self) -> bool {
        match self {
            FilterValue::Equals(v) | FilterValue::Compare(_, v) => is_blank(v),
            FilterValue::OneOf(values) => values.is_empty(),
        }
    }

    /// Read one field's condition from its JSON value
    fn from_json(field: &str, value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::Array(values) => Ok(FilterValue::OneOf(values.clone())),
            Value::Object(obj) if obj.contains_key("operator") => {
                let operator = match &obj["operator"] {
                    Value::String(s) => s.as_str(),
                    other => {
                        return Err(FilterError::InvalidOperator {
                            field: field.to_string(),
                            found: other.to_string(),
                        })
                    }
                };
                let operand = obj
                    .get("value")
                    .cloned()
                    .ok_or_else(|| FilterError::MissingOperatorValue {
                        field: field.to_string(),
                    })?;

                match FilterOp::from_name(operator) {
                    Some(op) => Ok(FilterValue::Compare(op, operand)),
                    None => {
                        warn!(field, operator, "Unknown filter operator, degrading to equality");
                        Ok(FilterValue::Compare(FilterOp::Eq, operand))
                    }
                }
            }
            other => Ok(FilterValue::Equals(other.clone())),
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

impl From<Value> for FilterValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(values) => FilterValue::OneOf(values),
            other => FilterValue::Equals(other),
        }
    }
}

/// One field-level condition, used inside the disjunction group
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub value: FilterValue,
}

impl Condition {
    pub fn new(field: impl Into<String>, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterValue::Equals(value.into()))
    }
}

/// Field conditions plus an optional disjunction group
///
/// Conditions are keyed by field, so inserting the same field twice keeps the
/// last condition, as a JSON object would.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterDescriptor {
    conditions: BTreeMap<String, FilterValue>,
    any_of: Vec<Condition>,
}

impl FilterDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON shape: an object of field conditions, with the reserved
    /// `or` key holding a list of condition objects
    ///
    /// `null` parses to an empty descriptor.
    pub fn from_json(value: &Value) -> Result<Self, FilterError> {
        let obj = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(obj) => obj,
            other => return Err(FilterError::NotAnObject(other.to_string())),
        };

        let mut descriptor = Self::default();
        for (key, raw) in obj {
            if key == DISJUNCTION_KEY {
                descriptor.any_of = parse_disjunction(raw)?;
                continue;
            }
            let value = FilterValue::from_json(key, raw)?;
            descriptor.conditions.insert(key.clone(), value);
        }
        Ok(descriptor)
    }

    /// Add or replace the condition for `field`
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: FilterValue) -> Self {
        self.conditions.insert(field.into(), value);
        self
    }

    #[must_use]
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, FilterValue::Equals(value.into()))
    }

    #[must_use]
    pub fn one_of<V: Into<Value>>(self, field: impl Into<String>, values: Vec<V>) -> Self {
        self.with(
            field,
            FilterValue::OneOf(values.into_iter().map(Into::into).collect()),
        )
    }

    #[must_use]
    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, FilterValue::Compare(FilterOp::Gte, value.into()))
    }

    #[must_use]
    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, FilterValue::Compare(FilterOp::Lte, value.into()))
    }

    #[must_use]
    pub fn like(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.with(
            field,
            FilterValue::Compare(FilterOp::Like, Value::String(pattern.into())),
        )
    }

    #[must_use]
    pub fn ilike(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.with(
            field,
            FilterValue::Compare(FilterOp::Ilike, Value::String(pattern.into())),
        )
    }

    /// Replace the disjunction group
    #[must_use]
    pub fn any_of(mut self, conditions: Vec<Condition>) -> Self {
        self.any_of = conditions;
        self
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.conditions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn disjunction(&self) -> &[Condition] {
        &self.any_of
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.any_of.is_empty()
    }
}

fn parse_disjunction(raw: &Value) -> Result<Vec<Condition>, FilterError> {
    let entries = match raw {
        Value::Null => return Ok(Vec::new()),
        Value::Array(entries) => entries,
        other => return Err(FilterError::InvalidDisjunction(other.to_string())),
    };

    let mut conditions = Vec::new();
    for entry in entries {
        let obj = entry
            .as_object()
            .ok_or_else(|| FilterError::InvalidDisjunction(entry.to_string()))?;
        for (field, raw) in obj {
            conditions.push(Condition::new(
                field.clone(),
                FilterValue::from_json(field, raw)?,
            ));
        }
    }
    Ok(conditions)
}
