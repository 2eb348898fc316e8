//! Shared fixtures for the integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::panic)]

use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use converge_core::{
    Condition, ConditionStatus, InMemoryStore, ObjectKey, ObjectMeta, Resource, ResourceStore, TypeMeta,
};
use converge_reconciler::{Component, Context, FinalizeStep, Finalized, ReconcileStep, Requeue};
use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

static TRACING: Once = Once::new();

/// Install a test subscriber once per test binary. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub status: AppStatus,
}

impl Resource for App {
    fn type_meta() -> TypeMeta {
        TypeMeta::new("apps.example.com", "v1alpha1", "App")
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn conditions(&self) -> Option<&[Condition]> {
        Some(&self.status.conditions)
    }

    fn conditions_mut(&mut self) -> Option<&mut Vec<Condition>> {
        Some(&mut self.status.conditions)
    }
}

pub fn key(name: &str) -> ObjectKey {
    ObjectKey::namespaced("default", name)
}

pub async fn seed(store: &InMemoryStore<App>, name: &str) -> App {
    let app = App::from_key(&key(name));
    store.insert(&app).await.unwrap();
    app
}

pub async fn fetch(store: &InMemoryStore<App>, name: &str) -> App {
    ResourceStore::get(store, &key(name)).await.unwrap()
}

/// Ordered log of component invocations.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

/// What a [`Probe`] does when invoked.
#[derive(Debug, Clone)]
pub enum Outcome {
    Ok(Requeue),
    Fail(&'static str),
}

/// Configurable component that journals its calls.
pub struct Probe {
    pub name: &'static str,
    pub journal: Journal,
    pub reconcile: Outcome,
    pub finalize: Option<(Outcome, bool)>,
    pub condition: Option<(&'static str, ConditionStatus, &'static str)>,
}

impl Probe {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            journal: journal.clone(),
            reconcile: Outcome::Ok(Requeue::none()),
            finalize: None,
            condition: None,
        }
    }

    pub fn requeue_after(mut self, secs: u64) -> Self {
        self.reconcile = Outcome::Ok(Requeue::after(Duration::from_secs(secs)));
        self
    }

    pub fn requeue_now(mut self) -> Self {
        self.reconcile = Outcome::Ok(Requeue::immediately());
        self
    }

    pub fn failing(mut self, message: &'static str) -> Self {
        self.reconcile = Outcome::Fail(message);
        self
    }

    /// Finalize capability reporting `done`.
    pub fn finalizer(mut self, done: bool) -> Self {
        self.finalize = Some((Outcome::Ok(Requeue::none()), done));
        self
    }

    pub fn finalizer_outcome(mut self, outcome: Outcome, done: bool) -> Self {
        self.finalize = Some((outcome, done));
        self
    }

    pub fn sets(mut self, type_: &'static str, status: ConditionStatus, reason: &'static str) -> Self {
        self.condition = Some((type_, status, reason));
        self
    }
}

#[async_trait]
impl ReconcileStep<App> for Probe {
    async fn reconcile(&self, ctx: &mut Context<App>) -> anyhow::Result<Requeue> {
        self.journal.push(format!("reconcile:{}", self.name));
        if let Some((type_, status, reason)) = self.condition {
            ctx.conditions.set(type_, status, reason, "");
        }
        match &self.reconcile {
            Outcome::Ok(requeue) => Ok(*requeue),
            Outcome::Fail(message) => Err(anyhow::anyhow!(*message)),
        }
    }
}

#[async_trait]
impl FinalizeStep<App> for Probe {
    async fn finalize(&self, _ctx: &mut Context<App>) -> anyhow::Result<Finalized> {
        self.journal.push(format!("finalize:{}", self.name));
        match &self.finalize {
            Some((Outcome::Ok(requeue), done)) => Ok(Finalized {
                requeue: *requeue,
                done: *done,
            }),
            Some((Outcome::Fail(message), _)) => Err(anyhow::anyhow!(*message)),
            None => panic!("finalize called on {} without the capability", self.name),
        }
    }
}

impl Component<App> for Probe {
    fn as_reconcile(&self) -> Option<&dyn ReconcileStep<App>> {
        Some(self)
    }

    fn as_finalize(&self) -> Option<&dyn FinalizeStep<App>> {
        if self.finalize.is_some() {
            Some(self)
        } else {
            None
        }
    }
}
