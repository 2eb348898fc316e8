//! Minimal-diff persistence of the working copy.
//!
//! Metadata and status are diffed separately against the clean snapshot so
//! each can be sent as its own merge patch, and only when it changed.

use converge_core::{Resource, create_merge_patch};
use serde_json::{Value, json};

use crate::error::Result;

/// Merge patch for labels, annotations and finalizers, or `None` if none of
/// them changed.
pub fn metadata_patch<R: Resource>(clean: &R, working: &R) -> Result<Option<Value>> {
    Ok(create_merge_patch(&metadata_view(clean)?, &metadata_view(working)?))
}

/// Merge patch for the `status` subtree, or `None` if it is unchanged.
pub fn status_patch<R: Resource>(clean: &R, working: &R) -> Result<Option<Value>> {
    Ok(create_merge_patch(&status_view(clean)?, &status_view(working)?))
}

fn metadata_view<R: Resource>(obj: &R) -> Result<Value> {
    let meta = obj.meta();
    Ok(json!({
        "metadata": {
            "labels": serde_json::to_value(&meta.labels)?,
            "annotations": serde_json::to_value(&meta.annotations)?,
            "finalizers": serde_json::to_value(&meta.finalizers)?,
        }
    }))
}

fn status_view<R: Resource>(obj: &R) -> Result<Value> {
    let mut value = serde_json::to_value(obj)?;
    let status = value
        .as_object_mut()
        .and_then(|map| map.remove("status"))
        .unwrap_or(Value::Null);
    Ok(json!({ "status": status }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use converge_core::{Condition, ConditionStatus, ObjectKey};
    use serde_json::json;

    use super::*;
    use crate::testing::Widget;

    fn widget() -> Widget {
        let mut w = Widget::from_key(&ObjectKey::namespaced("default", "w"));
        w.metadata.labels.insert("app".into(), "web".into());
        w
    }

    #[test]
    fn test_unchanged_object_has_no_patches() {
        let clean = widget();
        let working = clean.clone();
        assert_eq!(metadata_patch(&clean, &working).unwrap(), None);
        assert_eq!(status_patch(&clean, &working).unwrap(), None);
    }

    #[test]
    fn test_metadata_patch_covers_only_tracked_fields() {
        let clean = widget();
        let mut working = clean.clone();
        working.metadata.finalizers.push("widget.example.com/db".into());
        working.metadata.labels.remove("app");
        working.metadata.generation = 9;
        working.replicas = 4;

        let patch = metadata_patch(&clean, &working).unwrap().unwrap();
        assert_eq!(
            patch,
            json!({
                "metadata": {
                    "labels": {"app": null},
                    "finalizers": ["widget.example.com/db"],
                }
            })
        );
        assert_eq!(status_patch(&clean, &working).unwrap(), None);
    }

    #[test]
    fn test_status_patch_covers_conditions() {
        let clean = widget();
        let mut working = clean.clone();
        working
            .status
            .conditions
            .push(Condition::new("Ready", ConditionStatus::True, "Done", ""));

        let patch = status_patch(&clean, &working).unwrap().unwrap();
        let conditions = &patch["status"]["conditions"];
        assert_eq!(conditions[0]["type"], "Ready");
        assert_eq!(conditions[0]["status"], "True");
        assert_eq!(metadata_patch(&clean, &working).unwrap(), None);
    }
}
