//! Component-based reconcile engine for declarative resources.
//!
//! A [`Reconciler`] drives one resource type toward its desired state by
//! running an ordered list of independently written components against a
//! working copy of the resource, then writing back only what changed.
//!
//! # Key Concepts
//!
//! ## Reconcile cycle
//!
//! For one resource identity the engine:
//! 1. Fetches the resource (or reconstructs it from its identity in tolerant
//!    mode) and keeps a clean snapshot
//! 2. Ends early when the skip annotation is set to `"true"`
//! 3. Dispatches every component in registration order: reconcile while the
//!    resource is live, finalize once it is being deleted
//! 4. Flushes staged conditions after each component
//! 5. Patches metadata and status separately, each only when changed
//!
//! ## Components
//!
//! A component implements [`Component`] and advertises any of
//! [`ReconcileStep`], [`FinalizeStep`] and [`InitializeStep`]. Finalize-capable
//! components get a finalizer named `<base>/<component>` that is added while
//! the resource is live and removed once their finalize step reports done.
//!
//! ## Events
//!
//! Components report noteworthy changes with [`Context::event`]. Events go to
//! the [`EventRecorder`] set on the builder, which logs through `tracing` by
//! default.
//!
//! # Example
//!
//! ```ignore
//! use converge_core::{InMemoryStore, ObjectKey};
//! use converge_reconciler::ReconcilerBuilder;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = InMemoryStore::<App>::new_arc();
//!     let reconciler = ReconcilerBuilder::new(store)
//!         .component("service-account", ServiceAccount)
//!         .component("deployment", Deployment::default())
//!         .reconcile_not_found()
//!         .build()
//!         .await?;
//!
//!     let result = reconciler
//!         .reconcile(&ObjectKey::namespaced("default", "app"), CancellationToken::new())
//!         .await?;
//!     let requeue = result.into_result()?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod component;
pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod persist;
pub mod reconciler;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types
pub use component::{
    Capabilities, Component, FinalizeStep, InitializeStep, ReconcileStep, RegisteredComponent,
    finalizer_name,
};
pub use condition::ConditionBuffer;
pub use config::{PersistMode, ReconcilerConfig, SKIP_RECONCILE_ANNOTATION};
pub use context::{Context, ContextData, InitContext, Registrar, WatchDeclaration, WatchKind};
pub use error::{AggregateError, ComponentFailure, Error, Result};
pub use events::{Event, EventRecorder, EventType, TracingEventRecorder, reporter_name};
pub use reconciler::{Reconciler, ReconcilerBuilder, WebhookRegistrar};
pub use types::{CycleResult, Finalized, Requeue};
