//! Test fixtures shared by the unit tests.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use converge_core::{Condition, ConditionStatus, ObjectMeta, Resource, TypeMeta};
use serde::{Deserialize, Serialize};

use crate::component::{Component, FinalizeStep, ReconcileStep};
use crate::context::Context;
use crate::types::{Finalized, Requeue};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub replicas: u32,
    #[serde(default)]
    pub status: WidgetStatus,
}

impl Resource for Widget {
    fn type_meta() -> TypeMeta {
        TypeMeta::new("widgets.example.com", "v1", "Widget")
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

/// Records component invocations in order.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

/// Configurable component used across the unit tests.
pub struct Step {
    name: String,
    recorder: Recorder,
    requeue: Requeue,
    fail: bool,
    finalizing: bool,
    finalize_done: bool,
    condition: Option<(String, ConditionStatus, String)>,
}

impl Step {
    pub fn new(name: &str, recorder: &Recorder) -> Self {
        Self {
            name: name.to_string(),
            recorder: recorder.clone(),
            requeue: Requeue::none(),
            fail: false,
            finalizing: false,
            finalize_done: false,
            condition: None,
        }
    }

    pub fn finalizing(mut self) -> Self {
        self.finalizing = true;
        self
    }

    pub fn finalize_done(mut self) -> Self {
        self.finalizing = true;
        self.finalize_done = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn requeue(mut self, requeue: Requeue) -> Self {
        self.requeue = requeue;
        self
    }

    pub fn condition(mut self, type_: &str, status: ConditionStatus, reason: &str) -> Self {
        self.condition = Some((type_.to_string(), status, reason.to_string()));
        self
    }
}

#[async_trait]
impl ReconcileStep<Widget> for Step {
    async fn reconcile(&self, ctx: &mut Context<Widget>) -> anyhow::Result<Requeue> {
        self.recorder.record(format!("reconcile:{}", self.name));
        if let Some((type_, status, reason)) = &self.condition {
            ctx.conditions.set(type_.clone(), *status, reason.clone(), "");
        }
        if self.fail {
            anyhow::bail!("{} failed", self.name);
        }
        Ok(self.requeue)
    }
}

#[async_trait]
impl FinalizeStep<Widget> for Step {
    async fn finalize(&self, _ctx: &mut Context<Widget>) -> anyhow::Result<Finalized> {
        self.recorder.record(format!("finalize:{}", self.name));
        if self.fail {
            anyhow::bail!("{} failed to finalize", self.name);
        }
        Ok(Finalized {
            requeue: self.requeue,
            done: self.finalize_done,
        })
    }
}

impl Component<Widget> for Step {
    fn as_reconcile(&self) -> Option<&dyn ReconcileStep<Widget>> {
        Some(self)
    }

    fn as_finalize(&self) -> Option<&dyn FinalizeStep<Widget>> {
        self.finalizing.then_some(self as &dyn FinalizeStep<Widget>)
    }
}
