//! Single-field equality queries
//!
//! Exact match only: no type coercion, no nested paths. A missing field
//! never matches; a present `null` matches a `null` query value. Numbers
//! compare by value, so `1` matches `1.0`.

use serde_json::{Number, Value};

use super::errors::{json_type_name, DocumentError, DocumentResult};
use super::record::{Document, ID_FIELD};

/// A `(field, value)` equality predicate over top-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    field: String,
    value: Value,
}

impl Query {
    /// Match documents whose `field` equals `value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Match the document with the given id
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::eq(ID_FIELD, Value::String(id.into()))
    }

    /// Build a query from a JSON object holding exactly one pair,
    /// e.g. `{"name": "a"}`.
    pub fn from_object(value: &Value) -> DocumentResult<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| DocumentError::NotAnObject(json_type_name(value)))?;

        let mut pairs = map.iter();
        match (pairs.next(), pairs.next()) {
            (Some((field, value)), None) => Ok(Self::eq(field.clone(), value.clone())),
            _ => Err(DocumentError::InvalidQuery(map.len())),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Checks if a document matches
    pub fn matches(&self, document: &Document) -> bool {
        if self.field == ID_FIELD {
            return self.value.as_str() == Some(document.id());
        }
        match document.get(&self.field) {
            Some(actual) => values_equal(actual.as_ref(), &self.value),
            None => false,
        }
    }
}

/// Structural equality, with numbers compared by value
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    if a.is_f64() || b.is_f64() {
        return matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y);
    }
    // Negative i64 against a u64 above i64::MAX
    false
}
