//! Property-based tests using proptest.
//!
//! Properties verified:
//! - Repeated condition writes collapse to the last one
//! - Transition time changes only when status changes
//! - Requeue delay is the minimum non-zero delay requested
//! - A finalizer is removed if and only if its finalize step reports done

#![allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]

mod common;

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use common::{App, Journal, Outcome, Probe, fetch, key};
use converge_core::{Condition, ConditionStatus, InMemoryStore, Resource};
use converge_reconciler::{ConditionBuffer, ReconcilerBuilder, Requeue};
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

fn status_strategy() -> impl Strategy<Value = ConditionStatus> {
    prop_oneof![
        Just(ConditionStatus::True),
        Just(ConditionStatus::False),
        Just(ConditionStatus::Unknown),
    ]
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

/// Test helper: run a future to completion on a fresh runtime.
fn block_on<F: std::future::Future>(future: F) -> F::Output {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(future)
}

// ==========================================================================
// PROPERTY: Idempotent collapse
// ==========================================================================

proptest! {
    /// Property: N writes to one condition type followed by one flush leave
    /// exactly one condition equal to the last write.
    #[test]
    fn prop_repeated_sets_collapse_to_last(
        writes in prop::collection::vec((status_strategy(), "[A-Z][a-z]{1,8}"), 1..20),
        generation in 0i64..100,
    ) {
        let mut app = App::from_key(&key("app"));
        app.metadata.generation = generation;
        let mut buffer = ConditionBuffer::for_resource(&app);

        for (status, reason) in &writes {
            buffer.set("Ready", *status, reason.clone(), "");
        }
        buffer.flush_at(&mut app, at(1_000));

        let (last_status, last_reason) = writes.last().unwrap();
        prop_assert_eq!(app.status.conditions.len(), 1);
        let cond = &app.status.conditions[0];
        prop_assert_eq!(cond.status, *last_status);
        prop_assert_eq!(&cond.reason, last_reason);
        prop_assert_eq!(cond.observed_generation, Some(generation));
    }
}

// ==========================================================================
// PROPERTY: Transition time tracks status changes
// ==========================================================================

proptest! {
    /// Property: the transition time moves to "now" exactly when the status
    /// differs from the existing condition.
    #[test]
    fn prop_transition_time_changes_only_on_status_change(
        old in status_strategy(),
        new in status_strategy(),
        then in 0i64..1_000,
        now in 1_000i64..2_000,
    ) {
        let mut app = App::from_key(&key("app"));
        app.status
            .conditions
            .push(Condition::new("Ready", old, "Before", "").with_transition_time(at(then)));

        let mut buffer = ConditionBuffer::for_resource(&app);
        buffer.set("Ready", new, "After", "");
        buffer.flush_at(&mut app, at(now));

        let cond = &app.status.conditions[0];
        let expected = if old == new { at(then) } else { at(now) };
        prop_assert_eq!(cond.last_transition_time, Some(expected));
        prop_assert_eq!(cond.reason.as_str(), "After");
    }
}

// ==========================================================================
// PROPERTY: Minimum delay aggregation
// ==========================================================================

proptest! {
    /// Property: merged delay is the minimum of all non-zero requested delays,
    /// absent when none was requested.
    #[test]
    fn prop_requeue_delay_is_minimum_non_zero(
        delays in prop::collection::vec(prop::option::of(0u64..600), 0..12),
        immediate in prop::collection::vec(any::<bool>(), 0..12),
    ) {
        let mut acc = Requeue::none();
        for delay in &delays {
            let signal = delay.map_or_else(Requeue::none, |secs| Requeue::after(Duration::from_secs(secs)));
            acc.merge(signal);
        }
        for flag in &immediate {
            if *flag {
                acc.merge(Requeue::immediately());
            }
        }

        let expected = delays.iter().flatten().filter(|s| **s > 0).min().map(|s| Duration::from_secs(*s));
        prop_assert_eq!(acc.requeue_after, expected);
        prop_assert_eq!(acc.requeue, immediate.iter().any(|f| *f));
    }
}

// ==========================================================================
// PROPERTY: Finalizer removal
// ==========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: during deletion a component's finalizer is removed if and only
    /// if its finalize step succeeds and reports done.
    #[test]
    fn prop_finalizer_removed_iff_done(
        done in any::<bool>(),
        fails in any::<bool>(),
    ) {
        let remaining = block_on(async move {
            let store = InMemoryStore::<App>::new_arc();
            let mut app = App::from_key(&key("app"));
            app.metadata.finalizers = vec!["app.apps.example.com/db".to_string()];
            app.metadata.deletion_timestamp = Some(Utc::now());
            store.insert(&app).await.unwrap();

            let outcome = if fails {
                Outcome::Fail("cleanup failed")
            } else {
                Outcome::Ok(Requeue::none())
            };
            let journal = Journal::default();
            let reconciler = ReconcilerBuilder::new(store.clone())
                .component("db", Probe::new("db", &journal).finalizer_outcome(outcome, done))
                .build()
                .await
                .unwrap();

            let result = reconciler.reconcile(&key("app"), CancellationToken::new()).await.unwrap();
            assert_eq!(result.failures.len(), usize::from(fails));
            fetch(&store, "app").await.metadata.finalizers
        });

        let should_remove = done && !fails;
        prop_assert_eq!(remaining.is_empty(), should_remove);
    }
}
