//! Component capability model.
//!
//! A component is a named unit of reconciliation logic. Each capability is an
//! optional trait; a component advertises the ones it implements through the
//! `as_*` accessors on [`Component`], which the engine queries once at
//! registration.
//!
//! ```ignore
//! struct ServiceAccount;
//!
//! #[async_trait]
//! impl ReconcileStep<App> for ServiceAccount {
//!     async fn reconcile(&self, ctx: &mut Context<App>) -> anyhow::Result<Requeue> {
//!         ctx.conditions.set_true("ServiceAccountReady", "Created", "");
//!         Ok(Requeue::none())
//!     }
//! }
//!
//! impl Component<App> for ServiceAccount {
//!     fn as_reconcile(&self) -> Option<&dyn ReconcileStep<App>> {
//!         Some(self)
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use converge_core::{Resource, TypeMeta};

use crate::context::{Context, InitContext, Registrar};
use crate::types::{Finalized, Requeue};

/// Runs every cycle while the resource is not being deleted.
///
/// A step that returns `Err` gives up its requeue request for the cycle: the
/// error is recorded as a component failure and contributes nothing to the
/// merged [`Requeue`]. Return `Ok` with a requeue and report problems through
/// conditions when a retry interval matters.
#[async_trait]
pub trait ReconcileStep<R: Resource>: Send + Sync {
    async fn reconcile(&self, ctx: &mut Context<R>) -> anyhow::Result<Requeue>;
}

/// Runs instead of [`ReconcileStep`] once the resource is being deleted and
/// this component's finalizer is still present.
#[async_trait]
pub trait FinalizeStep<R: Resource>: Send + Sync {
    /// Return [`Finalized::done`] once external state has been released.
    ///
    /// On `Err` the finalizer stays in place and the step's requeue request
    /// is dropped, as for [`ReconcileStep::reconcile`].
    async fn finalize(&self, ctx: &mut Context<R>) -> anyhow::Result<Finalized>;
}

/// Runs once when the engine is built.
#[async_trait]
pub trait InitializeStep<R: Resource>: Send + Sync {
    async fn initialize(
        &self,
        ctx: &InitContext<'_, R>,
        registrar: &mut Registrar,
    ) -> anyhow::Result<()>;
}

/// A pluggable unit of reconciliation logic.
pub trait Component<R: Resource>: Send + Sync {
    /// The reconcile capability, if implemented.
    fn as_reconcile(&self) -> Option<&dyn ReconcileStep<R>> {
        None
    }

    /// The finalize capability. Components returning `Some` get a finalizer.
    fn as_finalize(&self) -> Option<&dyn FinalizeStep<R>> {
        None
    }

    /// The build-time initialize capability, if implemented.
    fn as_initialize(&self) -> Option<&dyn InitializeStep<R>> {
        None
    }

    /// Child type this component creates and owns.
    fn owns(&self) -> Option<TypeMeta> {
        None
    }
}

/// Capabilities discovered at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub reconcile: bool,
    pub finalize: bool,
    pub initialize: bool,
}

impl Capabilities {
    /// Query every `as_*` accessor of `component` once.
    pub fn of<R: Resource>(component: &dyn Component<R>) -> Self {
        Self {
            reconcile: component.as_reconcile().is_some(),
            finalize: component.as_finalize().is_some(),
            initialize: component.as_initialize().is_some(),
        }
    }
}

/// A component as held by the engine.
pub struct RegisteredComponent<R: Resource> {
    name: String,
    component: Arc<dyn Component<R>>,
    capabilities: Capabilities,
    owns: Option<TypeMeta>,
    finalizer: Option<String>,
}

impl<R: Resource> RegisteredComponent<R> {
    pub(crate) fn new(name: impl Into<String>, component: Arc<dyn Component<R>>) -> Self {
        let capabilities = Capabilities::of(component.as_ref());
        let owns = component.owns();
        Self {
            name: name.into(),
            component,
            capabilities,
            owns,
            finalizer: None,
        }
    }

    /// Registration name, unique within a reconciler.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capabilities captured at registration.
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Owned child type declared by the component.
    pub const fn owns(&self) -> Option<&TypeMeta> {
        self.owns.as_ref()
    }

    /// Finalizer name; set only for finalize-capable components.
    pub fn finalizer(&self) -> Option<&str> {
        self.finalizer.as_deref()
    }

    pub(crate) fn assign_finalizer(&mut self, base: &str) {
        if self.capabilities.finalize {
            self.finalizer = Some(finalizer_name(base, &self.name));
        }
    }

    pub(crate) fn reconcile_step(&self) -> Option<&dyn ReconcileStep<R>> {
        if self.capabilities.reconcile {
            self.component.as_reconcile()
        } else {
            None
        }
    }

    pub(crate) fn finalize_step(&self) -> Option<&dyn FinalizeStep<R>> {
        if self.capabilities.finalize {
            self.component.as_finalize()
        } else {
            None
        }
    }

    pub(crate) fn initialize_step(&self) -> Option<&dyn InitializeStep<R>> {
        if self.capabilities.initialize {
            self.component.as_initialize()
        } else {
            None
        }
    }
}

impl<R: Resource> std::fmt::Debug for RegisteredComponent<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredComponent")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("owns", &self.owns)
            .field("finalizer", &self.finalizer)
            .finish_non_exhaustive()
    }
}

/// Join a finalizer base path and a component name with a single `/`.
pub fn finalizer_name(base: &str, component: &str) -> String {
    let base = base.trim_end_matches('/');
    let component = component.trim_start_matches('/');
    if base.is_empty() {
        component.to_string()
    } else {
        format!("{base}/{component}")
    }
}
