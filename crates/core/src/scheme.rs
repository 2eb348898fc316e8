//! Registry of resource types known to a controller.

use std::collections::BTreeSet;

use crate::resource::Resource;
use crate::types::TypeMeta;

/// Set of registered resource types.
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    types: BTreeSet<TypeMeta>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource type. Returns `false` if it was already known.
    pub fn register<R: Resource>(&mut self) -> bool {
        self.types.insert(R::type_meta())
    }

    pub fn register_type(&mut self, type_meta: TypeMeta) -> bool {
        self.types.insert(type_meta)
    }

    /// Builder-style registration.
    #[must_use]
    pub fn with<R: Resource>(mut self) -> Self {
        self.register::<R>();
        self
    }

    #[must_use]
    pub fn with_type(mut self, type_meta: TypeMeta) -> Self {
        self.register_type(type_meta);
        self
    }

    pub fn contains(&self, type_meta: &TypeMeta) -> bool {
        self.types.contains(type_meta)
    }

    /// Look a type up by group and kind, ignoring version.
    pub fn find_kind(&self, group: &str, kind: &str) -> Option<&TypeMeta> {
        self.types.iter().find(|t| t.group == group && t.kind == kind)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeMeta> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
