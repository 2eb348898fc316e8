//! Per-cycle staging area for status condition changes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use converge_core::{Condition, ConditionStatus, Resource, set_status_condition_at};

/// Buffers condition writes made by a component until the engine flushes them
/// into the resource.
///
/// Repeated writes to the same condition type collapse to the latest one.
#[derive(Debug, Clone, Default)]
pub struct ConditionBuffer {
    pending: BTreeMap<String, Condition>,
    generation: i64,
}

impl ConditionBuffer {
    /// Create a buffer that stamps unset observed generations with `generation`.
    pub const fn new(generation: i64) -> Self {
        Self {
            pending: BTreeMap::new(),
            generation,
        }
    }

    /// Create a buffer bound to a resource's current generation.
    pub fn for_resource<R: Resource>(obj: &R) -> Self {
        Self::new(obj.meta().generation)
    }

    /// Stage a full condition.
    pub fn set_condition(&mut self, mut cond: Condition) {
        if cond.observed_generation.is_none() {
            cond.observed_generation = Some(self.generation);
        }
        self.pending.insert(cond.type_.clone(), cond);
    }

    /// Stage a condition built from its parts.
    pub fn set(
        &mut self,
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.set_condition(Condition::new(type_, status, reason, message));
    }

    /// Stage a condition with status `True`.
    pub fn set_true(&mut self, type_: impl Into<String>, reason: impl Into<String>, message: impl Into<String>) {
        self.set(type_, ConditionStatus::True, reason, message);
    }

    /// Stage a condition with status `False`.
    pub fn set_false(&mut self, type_: impl Into<String>, reason: impl Into<String>, message: impl Into<String>) {
        self.set(type_, ConditionStatus::False, reason, message);
    }

    /// Stage a condition with status `Unknown`.
    pub fn set_unknown(&mut self, type_: impl Into<String>, reason: impl Into<String>, message: impl Into<String>) {
        self.set(type_, ConditionStatus::Unknown, reason, message);
    }

    /// The staged value for a condition type, if any.
    pub fn pending(&self, type_: &str) -> Option<&Condition> {
        self.pending.get(type_)
    }

    /// Number of staged condition types.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Track a new resource generation for subsequent writes.
    pub const fn set_generation(&mut self, generation: i64) {
        self.generation = generation;
    }

    /// Merge every staged condition into `obj` and clear the buffer.
    ///
    /// Resources without a condition list are left untouched, but the buffer
    /// is still cleared.
    pub fn flush<R: Resource>(&mut self, obj: &mut R) {
        self.flush_at(obj, Utc::now());
    }

    /// [`flush`](Self::flush) with an explicit transition time.
    pub fn flush_at<R: Resource>(&mut self, obj: &mut R, now: DateTime<Utc>) {
        let pending = std::mem::take(&mut self.pending);
        let Some(conditions) = obj.conditions_mut() else {
            return;
        };
        for cond in pending.into_values() {
            set_status_condition_at(conditions, cond, now);
        }
    }
}
