//! Contexts handed to components.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use converge_core::{Resource, ResourceStore, Scheme, TypeMeta};
use tokio_util::sync::CancellationToken;

use crate::condition::ConditionBuffer;
use crate::events::{Event, EventRecorder, EventType, reporter_name};

/// Engine-level key/value data shared with every component.
#[derive(Clone, Default)]
pub struct ContextData {
    entries: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for ContextData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("ContextData").field("keys", &keys).finish()
    }
}

impl ContextData {
    /// Create an empty data map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Arc::new(value));
    }

    /// Typed lookup; `None` if the key is missing or holds another type.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Whether any value is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no data is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a component sees during one reconcile cycle.
///
/// The engine owns the context for the duration of the cycle and lends it to
/// each component in turn, so later components observe earlier mutations.
pub struct Context<R: Resource> {
    /// Working copy of the resource. Mutations here are persisted at cycle end.
    pub object: R,
    /// Condition writes, flushed into `object` after each component.
    pub conditions: ConditionBuffer,
    pub data: Arc<ContextData>,
    pub store: Arc<dyn ResourceStore<R>>,
    /// Receives events emitted about the primary resource.
    pub recorder: Arc<dyn EventRecorder>,
    /// Cancelled when the cycle should stop early.
    pub cancel: CancellationToken,
    controller: String,
    component: String,
}

impl<R: Resource> Context<R> {
    pub(crate) fn new(
        object: R,
        data: Arc<ContextData>,
        store: Arc<dyn ResourceStore<R>>,
        recorder: Arc<dyn EventRecorder>,
        cancel: CancellationToken,
        controller: impl Into<String>,
    ) -> Self {
        let conditions = ConditionBuffer::for_resource(&object);
        Self {
            object,
            conditions,
            data,
            store,
            recorder,
            cancel,
            controller: controller.into(),
            component: String::new(),
        }
    }

    pub(crate) fn enter(&mut self, component: &str) {
        self.component.clear();
        self.component.push_str(component);
        self.conditions.set_generation(self.object.meta().generation);
    }

    /// Flush staged conditions into the working copy.
    pub(crate) fn flush_conditions(&mut self) {
        self.conditions.flush(&mut self.object);
    }

    /// Name of the controller running the cycle.
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Name of the component currently being dispatched.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Whether the cycle has been asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Typed lookup into the shared engine data.
    pub fn data<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.data.get(key)
    }

    /// Emit an event about the resource being reconciled.
    ///
    /// Recorder failures are logged and do not fail the component.
    pub async fn event(&self, event_type: EventType, reason: &str, message: &str) {
        let event = Event {
            regarding: self.object.key(),
            type_meta: R::type_meta(),
            event_type,
            reason: reason.to_string(),
            message: message.to_string(),
            reporter: reporter_name(&self.controller),
        };
        if let Err(e) = self.recorder.record(event).await {
            tracing::warn!(component = %self.component, error = %format!("{e:#}"), "Failed to record event");
        }
    }
}

/// Minimal context for build-time initialization: no live resource and no
/// condition buffer.
pub struct InitContext<'a, R: Resource> {
    /// Store handle; the control loop is not running yet.
    pub store: Arc<dyn ResourceStore<R>>,
    pub scheme: &'a Scheme,
    pub data: &'a ContextData,
    /// Same recorder the reconcile cycles use.
    pub recorder: Arc<dyn EventRecorder>,
    controller: &'a str,
    component: &'a str,
}

impl<'a, R: Resource> InitContext<'a, R> {
    pub(crate) fn new(
        store: Arc<dyn ResourceStore<R>>,
        scheme: &'a Scheme,
        data: &'a ContextData,
        recorder: Arc<dyn EventRecorder>,
        controller: &'a str,
        component: &'a str,
    ) -> Self {
        Self {
            store,
            scheme,
            data,
            recorder,
            controller,
            component,
        }
    }

    /// Name of the controller being built.
    pub const fn controller(&self) -> &str {
        self.controller
    }

    /// Name of the component being initialized.
    pub const fn component(&self) -> &str {
        self.component
    }
}

/// How a secondary type relates to the primary resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    /// Created by a component and owned by the primary resource.
    Owns,
    /// Observed for changes, not owned.
    Watches,
}

/// A watch declaration made at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchDeclaration {
    pub type_meta: TypeMeta,
    pub kind: WatchKind,
    /// Every component that declared it, in declaration order.
    pub components: Vec<String>,
}

impl WatchDeclaration {
    /// Whether `component` made this declaration.
    pub fn declared_by(&self, component: &str) -> bool {
        self.components.iter().any(|c| c == component)
    }
}

/// Collects watch and ownership declarations for the external dispatch layer.
#[derive(Debug, Default)]
pub struct Registrar {
    declarations: Vec<WatchDeclaration>,
    current: String,
}

impl Registrar {
    /// Create an empty registrar.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter(&mut self, component: &str) {
        self.current.clear();
        self.current.push_str(component);
    }

    /// Declare an owned child type. Returns `false` if the type was already
    /// declared as owned; the current component is still recorded on it.
    pub fn owns(&mut self, type_meta: TypeMeta) -> bool {
        self.declare(type_meta, WatchKind::Owns)
    }

    /// Declare a watched type. Returns `false` if it was already watched.
    pub fn watches(&mut self, type_meta: TypeMeta) -> bool {
        self.declare(type_meta, WatchKind::Watches)
    }

    fn declare(&mut self, type_meta: TypeMeta, kind: WatchKind) -> bool {
        let existing = self
            .declarations
            .iter_mut()
            .find(|d| d.type_meta == type_meta && d.kind == kind);
        match existing {
            Some(decl) => {
                if !decl.declared_by(&self.current) {
                    tracing::debug!(
                        kind = ?kind,
                        type_meta = %type_meta,
                        component = %self.current,
                        "Watch already declared, adding component"
                    );
                    decl.components.push(self.current.clone());
                }
                false
            }
            None => {
                self.declarations.push(WatchDeclaration {
                    type_meta,
                    kind,
                    components: vec![self.current.clone()],
                });
                true
            }
        }
    }

    /// Declarations collected so far, one per type and kind.
    pub fn declarations(&self) -> &[WatchDeclaration] {
        &self.declarations
    }

    pub(crate) fn into_declarations(self) -> Vec<WatchDeclaration> {
        self.declarations
    }
}
