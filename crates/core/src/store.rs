//! Resource store trait and implementations.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Error;
use crate::patch::apply_merge_patch;
use crate::resource::Resource;
use crate::result::Result;
use crate::types::{ObjectKey, Subresource};

/// A merge patch addressed to one part of one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub key: ObjectKey,
    pub target: Subresource,
    /// RFC 7386 merge patch over the full serialized object.
    pub body: Value,
    /// Identity of the writer, used for conflict attribution.
    pub field_owner: String,
}

impl Patch {
    /// Create a metadata patch.
    pub fn metadata(key: ObjectKey, body: Value, field_owner: impl Into<String>) -> Self {
        Self {
            key,
            target: Subresource::Metadata,
            body,
            field_owner: field_owner.into(),
        }
    }

    /// Create a status patch.
    pub fn status(key: ObjectKey, body: Value, field_owner: impl Into<String>) -> Self {
        Self {
            key,
            target: Subresource::Status,
            body,
            field_owner: field_owner.into(),
        }
    }
}

/// Trait for resource storage backends.
#[async_trait]
pub trait ResourceStore<R: Resource>: Send + Sync {
    /// Fetch a resource. A missing resource is reported as [`Error::NotFound`].
    async fn get(&self, key: &ObjectKey) -> Result<R>;

    /// Apply a merge patch to the targeted part of a resource.
    async fn patch(&self, patch: Patch) -> Result<()>;
}

#[async_trait]
impl<R: Resource, S: ResourceStore<R> + ?Sized> ResourceStore<R> for Arc<S> {
    async fn get(&self, key: &ObjectKey) -> Result<R> {
        (**self).get(key).await
    }

    async fn patch(&self, patch: Patch) -> Result<()> {
        (**self).patch(patch).await
    }
}

/// In-memory resource store for testing and embedding.
///
/// Objects are kept in their serialized form so patches are applied exactly
/// as a server would apply them. Metadata patches only touch `metadata`,
/// status patches only touch `status`.
pub struct InMemoryStore<R> {
    objects: RwLock<HashMap<ObjectKey, Value>>,
    patches: RwLock<Vec<Patch>>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Resource> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            patches: RwLock::new(Vec::new()),
            _marker: PhantomData,
        }
    }
}

impl<R: Resource> InMemoryStore<R> {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new in-memory store wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Insert or replace an object.
    pub async fn insert(&self, obj: &R) -> Result<()> {
        let value = serde_json::to_value(obj)?;
        self.objects.write().await.insert(obj.key(), value);
        Ok(())
    }

    /// Remove an object, returning whether it existed.
    pub async fn remove(&self, key: &ObjectKey) -> bool {
        self.objects.write().await.remove(key).is_some()
    }

    /// Every patch applied so far, in order.
    pub async fn patches(&self) -> Vec<Patch> {
        self.patches.read().await.clone()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl<R: Resource> ResourceStore<R> for InMemoryStore<R> {
    async fn get(&self, key: &ObjectKey) -> Result<R> {
        let objects = self.objects.read().await;
        let value = objects.get(key).ok_or_else(|| Error::not_found(key))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    async fn patch(&self, patch: Patch) -> Result<()> {
        let field = match patch.target {
            Subresource::Metadata => "metadata",
            Subresource::Status => "status",
        };
        let Value::Object(body) = &patch.body else {
            return Err(Error::invalid_patch("patch body must be a JSON object"));
        };

        {
            let mut objects = self.objects.write().await;
            let current = objects
                .get_mut(&patch.key)
                .ok_or_else(|| Error::not_found(&patch.key))?;

            let mut updated = current.clone();
            if let Some(section) = body.get(field) {
                let mut scoped = serde_json::Map::new();
                scoped.insert(field.to_string(), section.clone());
                apply_merge_patch(&mut updated, &Value::Object(scoped));
            }

            // Reject patches that would leave the object undecodable.
            serde_json::from_value::<R>(updated.clone())?;
            *current = updated;
        }

        self.patches.write().await.push(patch);
        Ok(())
    }
}

/// A wrapper that adds tracing to a resource store.
pub struct TracingStore<S> {
    inner: S,
}

impl<S> TracingStore<S> {
    /// Create a new tracing store.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<R: Resource, S: ResourceStore<R>> ResourceStore<R> for TracingStore<S> {
    async fn get(&self, key: &ObjectKey) -> Result<R> {
        let kind = R::type_meta().kind;
        tracing::debug!(kind = %kind, key = %key, "Fetching resource");
        let result = self.inner.get(key).await;
        if let Err(ref e) = result {
            tracing::debug!(key = %key, error = %e, "Fetch failed");
        }
        result
    }

    async fn patch(&self, patch: Patch) -> Result<()> {
        tracing::debug!(
            key = %patch.key,
            target = %patch.target,
            field_owner = %patch.field_owner,
            "Patching resource"
        );
        let result = self.inner.patch(patch).await;
        if result.is_ok() {
            tracing::trace!("Patch applied");
        }
        result
    }
}
