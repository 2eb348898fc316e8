//! JSON merge patches (RFC 7386): computing the difference between two
//! documents and applying it back.

use serde_json::{Map, Value};

/// Compute the merge patch that turns `original` into `modified`.
///
/// Returns `None` when the documents are equal. Objects are diffed key by key,
/// keys missing from `modified` become `null`, and everything else (arrays
/// included) is replaced wholesale.
pub fn create_merge_patch(original: &Value, modified: &Value) -> Option<Value> {
    if original == modified {
        return None;
    }

    match (original, modified) {
        (Value::Object(orig), Value::Object(modi)) => {
            let mut patch = Map::new();

            for (key, old) in orig {
                match modi.get(key) {
                    Some(new) => {
                        if let Some(diff) = create_merge_patch(old, new) {
                            patch.insert(key.clone(), diff);
                        }
                    }
                    None => {
                        patch.insert(key.clone(), Value::Null);
                    }
                }
            }

            for (key, new) in modi {
                if !orig.contains_key(key) {
                    patch.insert(key.clone(), new.clone());
                }
            }

            if patch.is_empty() {
                None
            } else {
                Some(Value::Object(patch))
            }
        }
        _ => Some(modified.clone()),
    }
}

/// Apply a merge patch to `target` in place.
pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                let entry = target_map.entry(key.clone()).or_insert(Value::Null);
                apply_merge_patch(entry, value);
            }
        }
    }
}
