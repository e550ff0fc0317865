//! Alert policy.
//!
//! Maps a change set to a notify decision and a rendered message. Two states,
//! decided per cycle and never persisted: `Quiet` and `Alerting`. The
//! decision depends only on the first-run flag, `has_changes` and the
//! snapshot outcome; rendering never feeds back into it.

use chrono::Duration;
use serde::Serialize;

use crate::diff::ChangeSet;
use crate::render::{render_baseline, render_changes, render_failure};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    Quiet,
    Alerting,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertDecision {
    pub state: AlertState,
    pub should_notify: bool,
    pub rendered_message: String,
    /// The change set the decision was made on. `None` on the failure path,
    /// which never diffs.
    pub change_set: Option<ChangeSet>,
}

impl AlertDecision {
    fn new(state: AlertState, rendered_message: String, change_set: Option<ChangeSet>) -> Self {
        Self {
            state,
            should_notify: state == AlertState::Alerting,
            rendered_message,
            change_set,
        }
    }
}

/// Decide whether a successful cycle should notify.
///
/// - first run: `Quiet`, with an informational baseline message callers may log;
/// - transitions: `Alerting`;
/// - nothing changed: `Quiet`, message is the one-line summary.
///
/// A failure snapshot is routed to [`evaluate_failure`] and the change set is
/// discarded.
#[must_use]
pub fn evaluate(
    current: &Snapshot,
    change_set: ChangeSet,
    previous_age: Option<Duration>,
) -> AlertDecision {
    if !current.is_success() {
        return evaluate_failure(current);
    }

    if change_set.is_first_run {
        let message = render_baseline(current, &change_set);
        return AlertDecision::new(AlertState::Quiet, message, Some(change_set));
    }

    if change_set.has_changes {
        let message = render_changes(current, &change_set, previous_age);
        AlertDecision::new(AlertState::Alerting, message, Some(change_set))
    } else {
        let message = change_set.summary.clone();
        AlertDecision::new(AlertState::Quiet, message, Some(change_set))
    }
}

/// Failure path: always alerts, never diffs.
#[must_use]
pub fn evaluate_failure(snapshot: &Snapshot) -> AlertDecision {
    AlertDecision::new(AlertState::Alerting, render_failure(snapshot), None)
}

#[cfg(test)]
#[path = "alert_test.rs"]
mod tests;
