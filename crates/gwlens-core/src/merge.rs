//! JSON merge-patch (RFC 7386)
//!
//! Rules:
//! - Objects: recursive merge, patch keys win
//! - `null` in the patch deletes the key from the target
//! - Anything else (scalars, arrays): patch replaces target

use serde_json::{Map, Value as JsonValue};

/// Apply `patch` onto `target` in place
pub fn merge_patch(target: &mut JsonValue, patch: &JsonValue) {
    let JsonValue::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = JsonValue::Object(Map::new());
    }

    if let JsonValue::Object(target_map) = target {
        for (key, patch_value) in patch_map {
            if patch_value.is_null() {
                target_map.remove(key);
            } else {
                let entry = target_map.entry(key.clone()).or_insert(JsonValue::Null);
                merge_patch(entry, patch_value);
            }
        }
    }
}

/// Return `base` with `patch` applied, leaving both inputs untouched
pub fn merged(base: &JsonValue, patch: &JsonValue) -> JsonValue {
    let mut result = base.clone();
    merge_patch(&mut result, patch);
    result
}

/// Get a nested value by path
pub fn get_path<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let Some((key, remaining)) = path.split_first() else {
        return Some(value);
    };

    match value {
        JsonValue::Object(map) => map.get(*key).and_then(|v| get_path(v, remaining)),
        _ => None,
    }
}
