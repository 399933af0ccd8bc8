//! Field-level change detection.
//!
//! Compares an entity's persisted state with a partial update payload. Only
//! keys present in the payload are candidates, only allow-listed fields are
//! considered, and equality is decided on canonical values (see
//! [`crate::canonical`]). Reported values are the original, uncanonicalized
//! ones so the trail stays human-readable.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::canonical::equivalent;
use crate::enums::TrackedField;

/// One tracked field whose value actually differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldChange {
    pub field: TrackedField,
    pub old_value: Value,
    pub new_value: Value,
}

/// Detect changed fields, in `tracked` order.
///
/// `old_state` is the entity serialized as a JSON object; a missing key is
/// treated as `null`. Keys of `update` outside `tracked` are ignored.
#[must_use]
pub fn detect(
    old_state: &Value,
    update: &Map<String, Value>,
    tracked: &[TrackedField],
) -> Vec<FieldChange> {
    let changes: Vec<FieldChange> = tracked
        .iter()
        .filter_map(|field| {
            let new_value = update.get(field.as_str())?;
            let old_value = old_state.get(field.as_str());
            if equivalent(old_value, Some(new_value)) {
                return None;
            }
            Some(FieldChange {
                field: *field,
                old_value: old_value.cloned().unwrap_or(Value::Null),
                new_value: new_value.clone(),
            })
        })
        .collect();

    tracing::debug!(
        candidates = update.len(),
        changed = changes.len(),
        "change detection complete"
    );
    changes
}

/// Keys of `update` that are not on the allow-list, sorted.
#[must_use]
pub fn untracked_keys(update: &Map<String, Value>, tracked: &[TrackedField]) -> Vec<String> {
    let mut keys: Vec<String> = update
        .keys()
        .filter(|key| !tracked.iter().any(|f| f.as_str() == key.as_str()))
        .cloned()
        .collect();
    keys.sort();
    keys
}
