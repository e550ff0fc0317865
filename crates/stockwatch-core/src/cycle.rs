//! One fetch → diff → decide → notify → persist cycle.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alert::{evaluate, evaluate_failure, AlertDecision};
use crate::diff::diff;
use crate::snapshot::Snapshot;
use crate::traits::{DeliveryReport, FetchSource, NotificationSink, RecipientId, StateStore};

/// What happened to the current snapshot at the end of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Persisted {
    Saved,
    /// The fetch failed; the previous state was left untouched.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub snapshot: Snapshot,
    pub decision: AlertDecision,
    /// `None` when the decision was not to notify.
    pub delivery: Option<DeliveryReport>,
    pub persisted: Persisted,
}

impl CycleReport {
    /// A cycle counts as successful iff its fetch succeeded. Delivery and
    /// persistence problems are reported but do not fail the cycle.
    #[must_use]
    pub fn fetch_succeeded(&self) -> bool {
        self.snapshot.is_success()
    }
}

/// Run a single cycle.
///
/// A failed fetch notifies and returns without touching the store, so the
/// next successful cycle still diffs against the last good snapshot. Load,
/// delivery and save errors are logged and never abort the cycle.
pub async fn run_cycle<F, S, N>(
    source: &F,
    store: &S,
    sink: &N,
    recipients: &[RecipientId],
    now: DateTime<Utc>,
) -> CycleReport
where
    F: FetchSource + ?Sized,
    S: StateStore + ?Sized,
    N: NotificationSink + ?Sized,
{
    let current = source.fetch().await;

    if !current.is_success() {
        tracing::error!(
            reason = current.failure_reason().unwrap_or_default(),
            "fetch failed; state left untouched"
        );
        let decision = evaluate_failure(&current);
        let delivery = deliver(sink, recipients, &decision).await;
        return CycleReport {
            snapshot: current,
            decision,
            delivery: Some(delivery),
            persisted: Persisted::Skipped,
        };
    }

    let previous = match store.load().await {
        Ok(previous) => previous,
        Err(e) => {
            tracing::warn!(error = %e, "could not load previous snapshot; treating as first run");
            None
        }
    };

    let previous_age = previous
        .as_ref()
        .filter(|p| p.is_success())
        .map(|p| p.age_at(now));
    let changes = diff(previous.as_ref(), &current);
    tracing::info!(
        available = current.available_count(),
        unavailable = current.unavailable_count(),
        first_run = changes.is_first_run,
        has_changes = changes.has_changes,
        summary = %changes.summary,
        "cycle diff complete"
    );
    for store in &changes.became_available {
        tracing::info!(store_id = %store.store_id, name = %store.display_name, "store became available");
    }
    for store in &changes.became_unavailable {
        tracing::info!(store_id = %store.store_id, name = %store.display_name, "store sold out");
    }
    for store in &changes.removed {
        tracing::warn!(store_id = %store.store_id, name = %store.display_name, "store missing from feed");
    }

    let decision = evaluate(&current, changes, previous_age);
    let delivery = if decision.should_notify {
        Some(deliver(sink, recipients, &decision).await)
    } else {
        tracing::debug!(message = %decision.rendered_message, "no notification this cycle");
        None
    };

    let persisted = match store.save(&current).await {
        Ok(()) => Persisted::Saved,
        Err(e) => {
            tracing::error!(error = %e, "failed to persist snapshot");
            Persisted::Failed(e.to_string())
        }
    };

    CycleReport {
        snapshot: current,
        decision,
        delivery,
        persisted,
    }
}

async fn deliver<N>(sink: &N, recipients: &[RecipientId], decision: &AlertDecision) -> DeliveryReport
where
    N: NotificationSink + ?Sized,
{
    let report = sink.deliver(recipients, &decision.rendered_message).await;
    if report.succeeded() {
        tracing::info!(
            delivered = report.delivered_count(),
            failed = report.failed_count(),
            "notification delivered"
        );
    } else {
        tracing::warn!(
            recipients = recipients.len(),
            failed = report.failed_count(),
            "notification reached no recipient"
        );
    }
    report
}

#[cfg(test)]
#[path = "cycle_test.rs"]
mod tests;
