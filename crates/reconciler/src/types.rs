//! Core types for the reconciler.

use std::time::Duration;

use crate::error::{AggregateError, ComponentFailure, Error, Result};

/// When a component wants the resource reconciled again.
///
/// A zero delay means "no delay requested" and is stored as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Requeue {
    /// Requeue immediately.
    pub requeue: bool,
    /// Requeue after this delay.
    pub requeue_after: Option<Duration>,
}

impl Requeue {
    /// No requeue requested.
    pub const fn none() -> Self {
        Self {
            requeue: false,
            requeue_after: None,
        }
    }

    /// Requeue as soon as possible.
    pub const fn immediately() -> Self {
        Self {
            requeue: true,
            requeue_after: None,
        }
    }

    /// Requeue after `delay`. A zero delay requests nothing.
    pub fn after(delay: Duration) -> Self {
        Self {
            requeue: false,
            requeue_after: (!delay.is_zero()).then_some(delay),
        }
    }

    /// Whether anything was requested.
    pub const fn is_requested(&self) -> bool {
        self.requeue || self.requeue_after.is_some()
    }

    /// Fold another signal into this one: OR the flags, keep the shortest delay.
    pub fn merge(&mut self, other: Self) {
        self.requeue |= other.requeue;
        let ours = self.requeue_after.filter(|d| !d.is_zero());
        let theirs = other.requeue_after.filter(|d| !d.is_zero());
        self.requeue_after = match (ours, theirs) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }

    #[must_use]
    pub fn merged(mut self, other: Self) -> Self {
        self.merge(other);
        self
    }
}

/// Outcome of a finalize step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Finalized {
    pub requeue: Requeue,
    /// The component released its external state; its finalizer can go.
    pub done: bool,
}

impl Finalized {
    /// Cleanup is complete.
    pub const fn done() -> Self {
        Self {
            requeue: Requeue::none(),
            done: true,
        }
    }

    /// Cleanup is still in progress.
    pub const fn pending(requeue: Requeue) -> Self {
        Self {
            requeue,
            done: false,
        }
    }
}

/// Aggregate outcome of one reconcile cycle.
#[derive(Debug, Default)]
pub struct CycleResult {
    pub requeue: Requeue,
    /// Component failures, in dispatch order.
    pub failures: Vec<ComponentFailure>,
    /// Components that were dispatched, in order.
    pub dispatched: Vec<String>,
    /// Whether metadata or status was written back.
    pub persisted: bool,
}

impl CycleResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold component failures into a single error, keeping the requeue signal
    /// when every component succeeded.
    pub fn into_result(self) -> Result<Requeue> {
        if self.failures.is_empty() {
            Ok(self.requeue)
        } else {
            Err(Error::Components(AggregateError::new(self.failures)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_after_zero_requests_nothing() {
        assert_eq!(Requeue::after(Duration::ZERO), Requeue::none());
        assert!(!Requeue::after(Duration::ZERO).is_requested());
    }

    #[test]
    fn test_merge_keeps_minimum_non_zero_delay() {
        let mut acc = Requeue::none();
        acc.merge(Requeue::after(Duration::from_secs(30)));
        acc.merge(Requeue::none());
        acc.merge(Requeue::after(Duration::from_secs(5)));
        acc.merge(Requeue::after(Duration::from_secs(60)));

        assert_eq!(acc.requeue_after, Some(Duration::from_secs(5)));
        assert!(!acc.requeue);
    }

    #[test]
    fn test_merge_ors_immediate_flag() {
        let acc = Requeue::none()
            .merged(Requeue::immediately())
            .merged(Requeue::none());
        assert!(acc.requeue);
        assert_eq!(acc.requeue_after, None);
    }

    #[test]
    fn test_merge_ignores_literal_zero_delay() {
        let zero = Requeue {
            requeue: false,
            requeue_after: Some(Duration::ZERO),
        };
        let acc = Requeue::after(Duration::from_secs(3)).merged(zero);
        assert_eq!(acc.requeue_after, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_into_result() {
        let ok = CycleResult {
            requeue: Requeue::immediately(),
            ..Default::default()
        };
        assert_eq!(ok.into_result().ok(), Some(Requeue::immediately()));

        let failed = CycleResult {
            failures: vec![ComponentFailure::new("x", anyhow::anyhow!("boom"))],
            ..Default::default()
        };
        assert!(matches!(failed.into_result(), Err(Error::Components(_))));
    }
}
