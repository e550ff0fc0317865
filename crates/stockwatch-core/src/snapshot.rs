//! Availability snapshot model.
//!
//! A [`Snapshot`] is the typed result of one fetch cycle. It is immutable once
//! constructed: store identities are unique within it, and a `Failure`
//! snapshot never carries store data. Both invariants are enforced on
//! construction and again on deserialization, so a hand-edited state file
//! cannot smuggle duplicates into the diff engine.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Per-store availability record.
///
/// Only `available` is compared across snapshots. The descriptive fields are
/// carried through for display and default to empty when an older or newer
/// state file lacks them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStatus {
    /// Retailer-assigned store number (e.g. `"R623"`).
    pub store_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub region: String,
    pub available: bool,
    /// Pickup quote shown to humans (e.g. `"Available Today"`).
    #[serde(default)]
    pub availability_note: String,
}

/// Whether the fetch that produced a snapshot succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure { reason: String },
}

/// One point-in-time capture of availability across all stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SnapshotRecord")]
pub struct Snapshot {
    timestamp: DateTime<Utc>,
    product_label: String,
    outcome: Outcome,
    stores: Vec<StoreStatus>,
}

/// Wire shape of a snapshot; converted through [`Snapshot::from`] so the
/// uniqueness and failure invariants hold for loaded data too.
#[derive(Deserialize)]
struct SnapshotRecord {
    timestamp: DateTime<Utc>,
    #[serde(default)]
    product_label: String,
    outcome: Outcome,
    #[serde(default)]
    stores: Vec<StoreStatus>,
}

impl From<SnapshotRecord> for Snapshot {
    fn from(record: SnapshotRecord) -> Self {
        match record.outcome {
            Outcome::Success => Self::success(record.timestamp, record.product_label, record.stores),
            Outcome::Failure { reason } => {
                Self::failure(record.timestamp, record.product_label, reason)
            }
        }
    }
}

impl Snapshot {
    /// Builds a successful snapshot. Duplicate store ids are dropped, keeping
    /// the first occurrence and the original order.
    #[must_use]
    pub fn success(
        timestamp: DateTime<Utc>,
        product_label: impl Into<String>,
        stores: Vec<StoreStatus>,
    ) -> Self {
        Self {
            timestamp,
            product_label: product_label.into(),
            outcome: Outcome::Success,
            stores: dedup_stores(stores),
        }
    }

    /// Builds a failure snapshot. It carries no store data.
    #[must_use]
    pub fn failure(
        timestamp: DateTime<Utc>,
        product_label: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            product_label: product_label.into(),
            outcome: Outcome::Failure {
                reason: reason.into(),
            },
            stores: Vec::new(),
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn product_label(&self) -> &str {
        &self.product_label
    }

    #[must_use]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    #[must_use]
    pub fn stores(&self) -> &[StoreStatus] {
        &self.stores
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success)
    }

    /// The failure reason, or `None` for a successful snapshot.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success => None,
            Outcome::Failure { reason } => Some(reason),
        }
    }

    #[must_use]
    pub fn available_count(&self) -> usize {
        self.stores.iter().filter(|s| s.available).count()
    }

    #[must_use]
    pub fn unavailable_count(&self) -> usize {
        self.stores.len() - self.available_count()
    }

    /// Elapsed time between this snapshot and `now`. Clock skew that puts the
    /// snapshot in the future yields zero.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).max(Duration::zero())
    }
}

fn dedup_stores(stores: Vec<StoreStatus>) -> Vec<StoreStatus> {
    let mut seen: HashSet<String> = HashSet::with_capacity(stores.len());
    stores
        .into_iter()
        .filter(|store| {
            if seen.insert(store.store_id.clone()) {
                true
            } else {
                tracing::warn!(store_id = %store.store_id, "dropping duplicate store in snapshot");
                false
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn store(id: &str, available: bool) -> StoreStatus {
        StoreStatus {
            store_id: id.to_string(),
            display_name: format!("Store {id}"),
            city: "Miami".to_string(),
            region: "FL".to_string(),
            available,
            availability_note: String::new(),
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, hour, 0, 0).unwrap()
    }

    #[test]
    fn success_drops_duplicate_store_ids_keeping_first() {
        let snap = Snapshot::success(
            at(10),
            "iPhone 17",
            vec![store("R1", true), store("R2", false), store("R1", false)],
        );
        assert_eq!(snap.stores().len(), 2);
        assert_eq!(snap.stores()[0].store_id, "R1");
        assert!(snap.stores()[0].available);
        assert_eq!(snap.stores()[1].store_id, "R2");
    }

    #[test]
    fn failure_carries_no_stores() {
        let snap = Snapshot::failure(at(10), "iPhone 17", "timeout");
        assert!(!snap.is_success());
        assert!(snap.stores().is_empty());
        assert_eq!(snap.failure_reason(), Some("timeout"));
    }

    #[test]
    fn counts_split_available_and_unavailable() {
        let snap = Snapshot::success(
            at(10),
            "iPhone 17",
            vec![store("R1", true), store("R2", false), store("R3", true)],
        );
        assert_eq!(snap.available_count(), 2);
        assert_eq!(snap.unavailable_count(), 1);
    }

    #[test]
    fn age_at_is_never_negative() {
        let snap = Snapshot::success(at(12), "iPhone 17", vec![]);
        assert_eq!(snap.age_at(at(14)), Duration::hours(2));
        assert_eq!(snap.age_at(at(10)), Duration::zero());
    }

    #[test]
    fn serialized_layout_uses_documented_field_names() {
        let snap = Snapshot::success(at(10), "iPhone 17", vec![store("R1", true)]);
        let value = serde_json::to_value(&snap).unwrap();
        assert_eq!(value["product_label"], "iPhone 17");
        assert_eq!(value["outcome"]["status"], "success");
        assert_eq!(value["stores"][0]["store_id"], "R1");
        assert_eq!(value["stores"][0]["available"], true);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn deserialize_ignores_unknown_fields_and_defaults_missing_ones() {
        let json = r#"{
            "timestamp": "2026-01-15T10:00:00Z",
            "product_label": "iPhone 17",
            "outcome": {"status": "success"},
            "schema_version": 7,
            "stores": [
                {"store_id": "R1", "available": true, "distance_miles": 3.2}
            ]
        }"#;
        let snap: Snapshot = serde_json::from_str(json).unwrap();
        assert!(snap.is_success());
        assert_eq!(snap.stores().len(), 1);
        assert_eq!(snap.stores()[0].display_name, "");
        assert_eq!(snap.stores()[0].availability_note, "");
    }

    #[test]
    fn deserialize_enforces_uniqueness() {
        let json = r#"{
            "timestamp": "2026-01-15T10:00:00Z",
            "product_label": "iPhone 17",
            "outcome": {"status": "success"},
            "stores": [
                {"store_id": "R1", "available": true},
                {"store_id": "R1", "available": false}
            ]
        }"#;
        let snap: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.stores().len(), 1);
        assert!(snap.stores()[0].available);
    }

    #[test]
    fn deserialized_failure_drops_stray_stores() {
        let json = r#"{
            "timestamp": "2026-01-15T10:00:00Z",
            "product_label": "iPhone 17",
            "outcome": {"status": "failure", "reason": "boom"},
            "stores": [{"store_id": "R1", "available": true}]
        }"#;
        let snap: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.failure_reason(), Some("boom"));
        assert!(snap.stores().is_empty());
    }
}
