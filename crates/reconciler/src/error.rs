//! Error types for the reconciler crate.

use std::fmt;

use converge_core::ObjectKey;
use itertools::Itertools;
use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A component that failed during a cycle.
#[derive(Debug)]
pub struct ComponentFailure {
    pub component: String,
    pub error: anyhow::Error,
}

impl ComponentFailure {
    /// Record `error` against `component`.
    pub fn new(component: impl Into<String>, error: anyhow::Error) -> Self {
        Self {
            component: component.into(),
            error,
        }
    }
}

impl fmt::Display for ComponentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component {}: {:#}", self.component, self.error)
    }
}

/// Every component failure from one cycle, condensed into a single error.
#[derive(Debug, Default)]
pub struct AggregateError {
    failures: Vec<ComponentFailure>,
}

impl AggregateError {
    /// Wrap the failures of one cycle.
    pub const fn new(failures: Vec<ComponentFailure>) -> Self {
        Self { failures }
    }

    /// Failures in dispatch order.
    pub fn failures(&self) -> &[ComponentFailure] {
        &self.failures
    }

    /// Unwrap into the individual failures.
    pub fn into_failures(self) -> Vec<ComponentFailure> {
        self.failures
    }

    /// Names of the failed components, in dispatch order.
    pub fn components(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.component.as_str()).collect()
    }

    /// Number of failed components.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Whether no component failed.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.as_slice() {
            [] => write!(f, "no errors"),
            [only] => write!(f, "{only}"),
            many => write!(f, "[{}]", many.iter().join(", ")),
        }
    }
}

impl std::error::Error for AggregateError {}

/// Reconciler error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Fetching the resource failed for a reason other than not-found.
    #[error("failed to fetch '{key}': {source}")]
    Fetch {
        key: ObjectKey,
        source: converge_core::Error,
    },

    #[error("error patching metadata: {0}")]
    PatchMetadata(#[source] converge_core::Error),

    #[error("error patching status: {0}")]
    PatchStatus(#[source] converge_core::Error),

    /// One or more components failed; the cycle still ran to completion.
    #[error("{0}")]
    Components(#[from] AggregateError),

    #[error("duplicate component found using name {name}")]
    DuplicateComponent { name: String },

    #[error("cannot initialize component {component} in controller {controller}: {source:#}")]
    Initialize {
        component: String,
        controller: String,
        source: anyhow::Error,
    },

    #[error("unable to register webhook for {kind}: {source:#}")]
    Webhook { kind: String, source: anyhow::Error },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a fetch error.
    pub fn fetch(key: ObjectKey, source: converge_core::Error) -> Self {
        Self::Fetch { key, source }
    }

    /// Create a duplicate component error.
    pub fn duplicate_component(name: impl Into<String>) -> Self {
        Self::DuplicateComponent { name: name.into() }
    }

    /// Create an initialization error.
    pub fn initialize(
        component: impl Into<String>,
        controller: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::Initialize {
            component: component.into(),
            controller: controller.into(),
            source,
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether this error was raised while building the engine.
    pub const fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateComponent { .. }
                | Self::Initialize { .. }
                | Self::Webhook { .. }
                | Self::InvalidConfig { .. }
        )
    }

    /// Component failures, if this is an aggregate of them.
    pub const fn component_failures(&self) -> Option<&AggregateError> {
        match self {
            Self::Components(agg) => Some(agg),
            _ => None,
        }
    }
}
