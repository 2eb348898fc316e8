//! The resource abstraction every reconciled type implements.

use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::condition::Condition;
use crate::types::{ObjectKey, ObjectMeta, TypeMeta};

/// A declaratively described entity that can be fetched, mutated, and patched.
///
/// Status fields are expected to serialize under a top-level `status` key; the
/// engine diffs that subtree independently from metadata.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct App {
///     metadata: ObjectMeta,
///     spec: AppSpec,
///     #[serde(default)]
///     status: AppStatus,
/// }
///
/// impl Resource for App {
///     fn type_meta() -> TypeMeta {
///         TypeMeta::new("apps.example.com", "v1", "App")
///     }
///     fn meta(&self) -> &ObjectMeta { &self.metadata }
///     fn meta_mut(&mut self) -> &mut ObjectMeta { &mut self.metadata }
///     fn conditions_mut(&mut self) -> Option<&mut Vec<Condition>> {
///         Some(&mut self.status.conditions)
///     }
/// }
/// ```
pub trait Resource:
    Clone + Default + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Group/version/kind of this type.
    fn type_meta() -> TypeMeta;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    /// Condition list, if this type exposes one.
    fn conditions(&self) -> Option<&[Condition]> {
        None
    }

    /// Mutable condition list, if this type exposes one.
    fn conditions_mut(&mut self) -> Option<&mut Vec<Condition>> {
        None
    }

    /// A bare instance carrying only `key` as its identity.
    fn from_key(key: &ObjectKey) -> Self {
        let mut obj = Self::default();
        *obj.meta_mut() = ObjectMeta::from_key(key);
        obj
    }

    fn key(&self) -> ObjectKey {
        self.meta().key()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Widget;
    use super::*;

    #[test]
    fn test_from_key_sets_identity_only() {
        let key = ObjectKey::namespaced("default", "w1");
        let widget = Widget::from_key(&key);

        assert_eq!(widget.key(), key);
        assert_eq!(widget.replicas, 0);
        assert!(widget.meta().labels.is_empty());
    }
}
