//! Snapshot diff engine.
//!
//! Turns a previous snapshot (or its absence) and a current snapshot into a
//! [`ChangeSet`]. Pure and deterministic: stores are keyed by `store_id`
//! only, partitions keep the current snapshot's order, and descriptive
//! fields never influence classification.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::snapshot::{Snapshot, StoreStatus};

/// The partition a current store falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    BecameAvailable,
    BecameUnavailable,
    StillAvailable,
    StillUnavailable,
}

/// Four-way partition of the current snapshot's stores, plus the stores that
/// disappeared since the previous snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub became_available: Vec<StoreStatus>,
    pub became_unavailable: Vec<StoreStatus>,
    pub still_available: Vec<StoreStatus>,
    pub still_unavailable: Vec<StoreStatus>,
    /// Present in the previous snapshot, absent from the current one. Carries
    /// the previous record. Not counted in `has_changes`.
    pub removed: Vec<StoreStatus>,
    pub is_first_run: bool,
    pub has_changes: bool,
    pub summary: String,
}

impl ChangeSet {
    /// Which partition `store_id` landed in, if it is in the current snapshot.
    #[must_use]
    pub fn partition_of(&self, store_id: &str) -> Option<Partition> {
        let contains = |list: &[StoreStatus]| list.iter().any(|s| s.store_id == store_id);
        if contains(&self.became_available) {
            Some(Partition::BecameAvailable)
        } else if contains(&self.became_unavailable) {
            Some(Partition::BecameUnavailable)
        } else if contains(&self.still_available) {
            Some(Partition::StillAvailable)
        } else if contains(&self.still_unavailable) {
            Some(Partition::StillUnavailable)
        } else {
            None
        }
    }

    /// Stores currently available, whether newly or still.
    #[must_use]
    pub fn available_now(&self) -> usize {
        self.became_available.len() + self.still_available.len()
    }

    /// Stores currently unavailable, whether newly or still.
    #[must_use]
    pub fn unavailable_now(&self) -> usize {
        self.became_unavailable.len() + self.still_unavailable.len()
    }
}

/// Compare `current` against `previous`.
///
/// With no previous snapshot the run is a first run: every available store
/// is `became_available`, every unavailable one `became_unavailable`, and
/// `has_changes` is `true` so the observation is recorded. A previous
/// snapshot with a failure outcome is treated as absent.
#[must_use]
pub fn diff(previous: Option<&Snapshot>, current: &Snapshot) -> ChangeSet {
    let previous = previous.filter(|p| p.is_success());

    let Some(previous) = previous else {
        let (available, unavailable): (Vec<StoreStatus>, Vec<StoreStatus>) =
            current.stores().iter().cloned().partition(|s| s.available);
        let summary = format!(
            "first run: baseline captured, {} available / {} unavailable",
            available.len(),
            unavailable.len()
        );
        return ChangeSet {
            became_available: available,
            became_unavailable: unavailable,
            is_first_run: true,
            has_changes: true,
            summary,
            ..ChangeSet::default()
        };
    };

    let prev_map: HashMap<&str, &StoreStatus> = previous
        .stores()
        .iter()
        .map(|s| (s.store_id.as_str(), s))
        .collect();

    let mut changes = ChangeSet::default();

    for store in current.stores() {
        let was_available = prev_map
            .get(store.store_id.as_str())
            .is_some_and(|prev| prev.available);

        let bucket = match (store.available, was_available) {
            (true, false) => &mut changes.became_available,
            (true, true) => &mut changes.still_available,
            (false, true) => &mut changes.became_unavailable,
            (false, false) => &mut changes.still_unavailable,
        };
        bucket.push(store.clone());
    }

    let curr_ids: HashSet<&str> = current
        .stores()
        .iter()
        .map(|s| s.store_id.as_str())
        .collect();
    changes.removed = previous
        .stores()
        .iter()
        .filter(|s| !curr_ids.contains(s.store_id.as_str()))
        .cloned()
        .collect();

    changes.has_changes =
        !changes.became_available.is_empty() || !changes.became_unavailable.is_empty();
    changes.summary = summarize(&changes);
    changes
}

fn summarize(changes: &ChangeSet) -> String {
    let mut summary = if changes.has_changes {
        let mut parts = Vec::new();
        if !changes.became_available.is_empty() {
            parts.push(format!(
                "{} store(s) newly available",
                changes.became_available.len()
            ));
        }
        if !changes.became_unavailable.is_empty() {
            parts.push(format!(
                "{} store(s) no longer available",
                changes.became_unavailable.len()
            ));
        }
        format!("changes detected: {}", parts.join(", "))
    } else {
        format!(
            "no changes, {} available / {} unavailable",
            changes.available_now(),
            changes.unavailable_now()
        )
    };

    if !changes.removed.is_empty() {
        summary.push_str(&format!(
            " ({} store(s) missing from feed)",
            changes.removed.len()
        ));
    }
    summary
}

#[cfg(test)]
#[path = "diff_test.rs"]
mod tests;
