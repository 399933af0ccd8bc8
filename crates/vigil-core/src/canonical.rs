//! Value canonicalization.
//!
//! Reduces a field value to a representation-independent form so that
//! "did this field change" is a plain structural comparison:
//!
//! - scalars map to themselves (integral floats compare equal to integers)
//! - a reference, given either as a bare id or as an object carrying `id` /
//!   `_id`, reduces to the bare id
//! - lists reduce element-wise and are then sorted, so membership is compared
//!   and order is not
//! - `null`, an absent value and an empty list are all [`ComparableValue::Null`]

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::{Number, Value};

/// Keys that identify an expanded reference object.
pub const REFERENCE_ID_KEYS: &[&str] = &["id", "_id"];

/// Canonical, comparable form of a field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparableValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    List(Vec<ComparableValue>),
    Map(BTreeMap<String, ComparableValue>),
}

impl ComparableValue {
    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Number(_) => 2,
            Self::Text(_) => 3,
            Self::List(_) => 4,
            Self::Map(_) => 5,
        }
    }
}

/// Total order used to sort list members. Agrees with `Eq`.
impl Ord for ComparableValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => compare_numbers(a, b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => a.cmp(b),
            (Self::Map(a), Self::Map(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for ComparableValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    let by_value = match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a
            .as_f64()
            .unwrap_or(f64::NAN)
            .total_cmp(&b.as_f64().unwrap_or(f64::NAN)),
    };
    // Distinct numbers that share an f64 approximation still need a tie-break.
    by_value.then_with(|| a.to_string().cmp(&b.to_string()))
}

/// Canonicalize an optional value; `None` means the field is absent.
#[must_use]
pub fn canonicalize_opt(value: Option<&Value>) -> ComparableValue {
    value.map_or(ComparableValue::Null, canonicalize)
}

/// Canonicalize a single JSON value.
#[must_use]
pub fn canonicalize(value: &Value) -> ComparableValue {
    match value {
        Value::Null => ComparableValue::Null,
        Value::Bool(b) => ComparableValue::Bool(*b),
        Value::Number(n) => ComparableValue::Number(normalize_number(n)),
        Value::String(s) => ComparableValue::Text(s.clone()),
        Value::Array(items) => {
            if items.is_empty() {
                return ComparableValue::Null;
            }
            let mut members: Vec<ComparableValue> = items.iter().map(canonicalize).collect();
            members.sort();
            ComparableValue::List(members)
        }
        Value::Object(map) => reference_id(map).map_or_else(
            || {
                ComparableValue::Map(
                    map.iter()
                        .map(|(k, v)| (k.clone(), canonicalize(v)))
                        .collect(),
                )
            },
            |id| ComparableValue::Text(id.to_string()),
        ),
    }
}

/// Whether two values are the same after canonicalization.
#[must_use]
pub fn equivalent(a: Option<&Value>, b: Option<&Value>) -> bool {
    canonicalize_opt(a) == canonicalize_opt(b)
}

/// The bare id of a reference given either as a string or an expanded object.
#[must_use]
pub fn reference_id_of(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => reference_id(map),
        _ => None,
    }
}

fn reference_id(map: &serde_json::Map<String, Value>) -> Option<&str> {
    REFERENCE_ID_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn normalize_number(n: &Number) -> Number {
    if n.is_i64() || n.is_u64() {
        return n.clone();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
            Number::from(f as i64)
        }
        _ => n.clone(),
    }
}
