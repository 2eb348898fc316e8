//! Events reported against the primary resource.

use std::fmt;

use async_trait::async_trait;
use converge_core::{ObjectKey, TypeMeta};

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Normal,
    Warning,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "Normal"),
            Self::Warning => write!(f, "Warning"),
        }
    }
}

/// A human-readable record of something that happened to a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Resource the event is about.
    pub regarding: ObjectKey,
    pub type_meta: TypeMeta,
    pub event_type: EventType,
    /// Short machine-friendly cause, e.g. `Created`.
    pub reason: String,
    pub message: String,
    /// Reporting controller, `<name>-controller`.
    pub reporter: String,
}

/// Sink for events emitted by components.
#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn record(&self, event: Event) -> anyhow::Result<()>;
}

/// Recorder that writes events to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventRecorder;

#[async_trait]
impl EventRecorder for TracingEventRecorder {
    async fn record(&self, event: Event) -> anyhow::Result<()> {
        match event.event_type {
            EventType::Normal => tracing::info!(
                reporter = %event.reporter,
                kind = %event.type_meta.kind,
                resource = %event.regarding,
                reason = %event.reason,
                "{}",
                event.message
            ),
            EventType::Warning => tracing::warn!(
                reporter = %event.reporter,
                kind = %event.type_meta.kind,
                resource = %event.regarding,
                reason = %event.reason,
                "{}",
                event.message
            ),
        }
        Ok(())
    }
}

/// Name a controller reports events under.
pub fn reporter_name(controller: &str) -> String {
    format!("{controller}-controller")
}
