//! Reconciler implementation.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use converge_core::{ObjectKey, Patch, Resource, ResourceStore, ResultExt, Scheme, TypeMeta};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::component::{Component, RegisteredComponent};
use crate::config::ReconcilerConfig;
use crate::context::{Context, ContextData, InitContext, Registrar, WatchDeclaration};
use crate::error::{ComponentFailure, Error, Result};
use crate::events::{EventRecorder, TracingEventRecorder};
use crate::persist;
use crate::types::{CycleResult, Requeue};

/// Registers admission webhooks for the primary resource type.
#[async_trait]
pub trait WebhookRegistrar: Send + Sync {
    /// Register the webhook for `type_meta`. Failures abort the build.
    async fn register(&self, type_meta: &TypeMeta) -> anyhow::Result<()>;
}

/// Component-based reconciler for one resource type.
///
/// Built once by [`ReconcilerBuilder`]; after that the component list and
/// finalizer names are immutable, so one reconciler can serve concurrent
/// cycles for different resources.
pub struct Reconciler<R: Resource> {
    name: String,
    components: Vec<RegisteredComponent<R>>,
    store: Arc<dyn ResourceStore<R>>,
    data: Arc<ContextData>,
    recorder: Arc<dyn EventRecorder>,
    scheme: Scheme,
    config: ReconcilerConfig,
    finalizer_base: String,
    watches: Vec<WatchDeclaration>,
}

impl<R: Resource> Reconciler<R> {
    /// Run one reconcile cycle for `key`.
    ///
    /// Component failures do not fail the cycle; they are collected in the
    /// returned [`CycleResult`]. Fetch errors other than not-found and patch
    /// errors are returned as `Err`.
    pub async fn reconcile(&self, key: &ObjectKey, cancel: CancellationToken) -> Result<CycleResult> {
        let kind = R::type_meta().resource_name();
        let span = tracing::info_span!("reconcile", controller = %self.name, kind = %kind, resource = %key);
        self.run_cycle(key, cancel).instrument(span).await
    }

    async fn run_cycle(&self, key: &ObjectKey, cancel: CancellationToken) -> Result<CycleResult> {
        info!("Starting reconcile");

        let fetched = self
            .store
            .get(key)
            .await
            .not_found_as_none()
            .inspect_error(|e| warn!(error = %e, "Failed to fetch reconcile object"))
            .map_err(|e| Error::fetch(key.clone(), e))?;

        let (object, reconstructed) = match fetched {
            Some(obj) => (obj, false),
            None if self.config.abort_on_not_found => {
                info!("Aborting reconcile, object not found (assuming it was deleted)");
                return Ok(CycleResult::default());
            }
            None => {
                debug!("Object not found, reconciling from its identity");
                (R::from_key(key), true)
            }
        };
        let clean = object.clone();

        if self.is_skipped(&clean) {
            info!("Skipping reconcile due to annotation");
            return Ok(CycleResult::default());
        }

        let mut ctx = Context::new(
            object,
            Arc::clone(&self.data),
            Arc::clone(&self.store),
            Arc::clone(&self.recorder),
            cancel,
            &self.name,
        );
        let mut result = CycleResult::default();

        for comp in &self.components {
            let outcome = self.dispatch(comp, &mut ctx).await;
            ctx.flush_conditions();

            let Some(outcome) = outcome else {
                continue;
            };
            result.dispatched.push(comp.name().to_string());
            match outcome {
                Ok(requeue) => result.requeue.merge(requeue),
                Err(e) => {
                    warn!(component = comp.name(), error = %format!("{e:#}"), "Component reconciliation failed");
                    result.failures.push(ComponentFailure::new(comp.name(), e));
                }
            }
        }

        if self.config.should_persist() {
            result.persisted = self.persist(&clean, &ctx.object, reconstructed).await?;
        }

        if result.is_success() {
            info!(
                requeue = result.requeue.requeue,
                requeue_after = ?result.requeue.requeue_after,
                "Reconciliation complete"
            );
        } else {
            let failed: Vec<&str> = result.failures.iter().map(|f| f.component.as_str()).collect();
            warn!(failed = ?failed, "Reconciliation complete with component failures");
        }

        Ok(result)
    }

    /// Invoke the step appropriate for the resource's lifecycle phase.
    ///
    /// Returns `None` when the component does not take part in this cycle.
    async fn dispatch(
        &self,
        comp: &RegisteredComponent<R>,
        ctx: &mut Context<R>,
    ) -> Option<anyhow::Result<Requeue>> {
        ctx.enter(comp.name());

        if !ctx.object.meta().is_being_deleted() {
            debug!(component = comp.name(), "Reconciling component");
            let outcome = match comp.reconcile_step() {
                Some(step) => step.reconcile(ctx).await,
                None => Ok(Requeue::none()),
            };
            let registered = comp
                .finalizer()
                .filter(|f| ctx.object.meta_mut().add_finalizer(f));
            if let Some(finalizer) = registered {
                debug!(component = comp.name(), finalizer, "Registering finalizer");
            }
            return Some(outcome);
        }

        let finalizer = comp.finalizer()?;
        if !ctx.object.meta().has_finalizer(finalizer) {
            return None;
        }
        let step = comp.finalize_step()?;

        debug!(component = comp.name(), "Finalizing component");
        match step.finalize(ctx).await {
            Ok(finalized) => {
                if finalized.done {
                    debug!(component = comp.name(), finalizer, "Removing finalizer");
                    ctx.object.meta_mut().remove_finalizer(finalizer);
                }
                Some(Ok(finalized.requeue))
            }
            Err(e) => Some(Err(e)),
        }
    }

    /// Write metadata then status changes back. Returns whether anything was
    /// patched.
    async fn persist(&self, clean: &R, working: &R, reconstructed: bool) -> Result<bool> {
        let key = clean.key();
        let mut persisted = false;

        if let Some(body) = persist::metadata_patch(clean, working)? {
            match self.store.patch(Patch::metadata(key.clone(), body, &self.name)).await {
                Ok(()) => persisted = true,
                Err(e) if self.ignores_missing(reconstructed, &e) => {
                    warn!(error = %e, "Reconstructed object still missing, dropping metadata changes");
                    return Ok(false);
                }
                Err(e) => return Err(Error::PatchMetadata(e)),
            }
        }

        if let Some(body) = persist::status_patch(clean, working)? {
            match self.store.patch(Patch::status(key, body, &self.name)).await {
                Ok(()) => persisted = true,
                Err(e) if self.ignores_missing(reconstructed, &e) => {
                    warn!(error = %e, "Reconstructed object still missing, dropping status changes");
                }
                Err(e) => return Err(Error::PatchStatus(e)),
            }
        }

        Ok(persisted)
    }

    fn ignores_missing(&self, reconstructed: bool, err: &converge_core::Error) -> bool {
        reconstructed && self.config.ignore_missing_on_persist && err.is_not_found()
    }

    fn is_skipped(&self, obj: &R) -> bool {
        obj.meta().annotation(&self.config.skip_annotation) == Some("true")
    }

    /// Controller name, also used as the patch field owner.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prefix every component finalizer is built from.
    pub fn finalizer_base(&self) -> &str {
        &self.finalizer_base
    }

    /// Finalizer name of a finalize-capable component.
    pub fn finalizer_name(&self, component: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|c| c.name() == component)
            .and_then(RegisteredComponent::finalizer)
    }

    /// Registered components in dispatch order.
    pub fn components(&self) -> &[RegisteredComponent<R>] {
        &self.components
    }

    /// Watch and ownership declarations collected at build time.
    pub fn watches(&self) -> &[WatchDeclaration] {
        &self.watches
    }

    /// Scheme handed to initializers, including the primary type.
    pub const fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// Effective configuration.
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

impl<R: Resource> std::fmt::Debug for Reconciler<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("name", &self.name)
            .field("components", &self.components)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for Reconciler.
pub struct ReconcilerBuilder<R: Resource> {
    store: Arc<dyn ResourceStore<R>>,
    components: Vec<(String, Arc<dyn Component<R>>)>,
    data: ContextData,
    scheme: Scheme,
    webhooks: Option<Arc<dyn WebhookRegistrar>>,
    recorder: Arc<dyn EventRecorder>,
    config: ReconcilerConfig,
}

impl<R: Resource> ReconcilerBuilder<R> {
    /// Create a new builder.
    pub fn new(store: Arc<dyn ResourceStore<R>>) -> Self {
        Self {
            store,
            components: Vec::new(),
            data: ContextData::new(),
            scheme: Scheme::new(),
            webhooks: None,
            recorder: Arc::new(TracingEventRecorder),
            config: ReconcilerConfig::default(),
        }
    }

    /// Set the controller name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// Register a component. Components run in registration order.
    #[must_use]
    pub fn component(mut self, name: impl Into<String>, component: impl Component<R> + 'static) -> Self {
        self.components.push((name.into(), Arc::new(component)));
        self
    }

    /// Keep reconciling when the resource is missing, starting from an object
    /// with only its identity set.
    #[must_use]
    pub fn reconcile_not_found(mut self) -> Self {
        self.config.abort_on_not_found = false;
        self
    }

    /// Set data shared with every component.
    #[must_use]
    pub fn with_context_data(mut self, data: ContextData) -> Self {
        self.data = data;
        self
    }

    /// Override the finalizer prefix.
    #[must_use]
    pub fn with_finalizer_base(mut self, base: impl Into<String>) -> Self {
        self.config.finalizer_base = Some(base.into());
        self
    }

    /// Set the scheme handed to initializers. The primary type is added at
    /// build time.
    #[must_use]
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Register a webhook for the primary type at build time.
    #[must_use]
    pub fn with_webhooks(mut self, registrar: Arc<dyn WebhookRegistrar>) -> Self {
        self.webhooks = Some(registrar);
        self
    }

    /// Send component events to `recorder` instead of the tracing log.
    #[must_use]
    pub fn with_event_recorder(mut self, recorder: Arc<dyn EventRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Replace the whole configuration, including anything set by earlier
    /// builder calls.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the reconciler, running every initializer once.
    pub async fn build(self) -> Result<Reconciler<R>> {
        self.config.validate()?;

        let type_meta = R::type_meta();
        let name = self
            .config
            .name
            .clone()
            .unwrap_or_else(|| type_meta.kind.to_lowercase());
        let finalizer_base = self.config.finalizer_base.clone().unwrap_or_else(|| {
            if type_meta.group.is_empty() {
                format!("{name}/")
            } else {
                format!("{name}.{}/", type_meta.group)
            }
        });

        let mut scheme = self.scheme;
        scheme.register::<R>();

        let mut seen = HashSet::new();
        let mut components = Vec::with_capacity(self.components.len());
        for (comp_name, comp) in self.components {
            if !seen.insert(comp_name.clone()) {
                return Err(Error::duplicate_component(comp_name));
            }
            let mut registered = RegisteredComponent::new(comp_name, comp);
            registered.assign_finalizer(&finalizer_base);
            components.push(registered);
        }

        let mut registrar = Registrar::new();
        for comp in &components {
            registrar.enter(comp.name());
            if let Some(owned) = comp.owns() {
                registrar.owns(owned.clone());
            }
            let Some(step) = comp.initialize_step() else {
                continue;
            };
            debug!(controller = %name, component = comp.name(), "Initializing component");
            let ctx = InitContext::new(
                Arc::clone(&self.store),
                &scheme,
                &self.data,
                Arc::clone(&self.recorder),
                &name,
                comp.name(),
            );
            step.initialize(&ctx, &mut registrar)
                .await
                .map_err(|e| Error::initialize(comp.name(), name.as_str(), e))?;
        }

        if let Some(webhooks) = &self.webhooks {
            webhooks
                .register(&type_meta)
                .await
                .map_err(|source| Error::Webhook {
                    kind: type_meta.kind.clone(),
                    source,
                })?;
        }

        info!(
            controller = %name,
            components = components.len(),
            finalizer_base = %finalizer_base,
            "Reconciler built"
        );

        Ok(Reconciler {
            name,
            components,
            store: self.store,
            data: Arc::new(self.data),
            recorder: self.recorder,
            scheme,
            config: self.config,
            finalizer_base,
            watches: registrar.into_declarations(),
        })
    }
}
