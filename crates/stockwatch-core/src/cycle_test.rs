use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::TimeZone;

use super::*;
use crate::alert::AlertState;
use crate::snapshot::StoreStatus;
use crate::traits::{RecipientOutcome, RecipientResult};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct FakeStoreError(String);

/// Returns queued snapshots in order.
struct ScriptedSource {
    queue: Mutex<VecDeque<Snapshot>>,
}

impl ScriptedSource {
    fn new(snapshots: Vec<Snapshot>) -> Self {
        Self {
            queue: Mutex::new(snapshots.into()),
        }
    }
}

#[async_trait]
impl FetchSource for ScriptedSource {
    async fn fetch(&self) -> Snapshot {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .expect("source script exhausted")
    }
}

#[derive(Default)]
struct MemoryStore {
    slot: Mutex<Option<Snapshot>>,
    fail_load: bool,
    fail_save: bool,
}

#[async_trait]
impl StateStore for MemoryStore {
    type Error = FakeStoreError;

    async fn load(&self) -> Result<Option<Snapshot>, Self::Error> {
        if self.fail_load {
            return Err(FakeStoreError("disk on fire".to_string()));
        }
        Ok(self.slot.lock().unwrap().clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), Self::Error> {
        if self.fail_save {
            return Err(FakeStoreError("read-only filesystem".to_string()));
        }
        *self.slot.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), Self::Error> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}

/// Records every message and answers with a fixed per-recipient outcome.
struct RecordingSink {
    sent: Mutex<Vec<String>>,
    outcome: RecipientOutcome,
}

impl RecordingSink {
    fn delivering() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            outcome: RecipientOutcome::Delivered,
        }
    }

    fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            outcome: RecipientOutcome::Failed("bot was blocked by the user".to_string()),
        }
    }

    fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, recipients: &[RecipientId], message: &str) -> DeliveryReport {
        self.sent.lock().unwrap().push(message.to_string());
        DeliveryReport {
            results: recipients
                .iter()
                .map(|r| RecipientResult {
                    recipient: r.clone(),
                    outcome: self.outcome.clone(),
                })
                .collect(),
        }
    }
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, hour, 0, 0).unwrap()
}

fn store(id: &str, available: bool) -> StoreStatus {
    StoreStatus {
        store_id: id.to_string(),
        display_name: format!("Apple {id}"),
        city: "Miami".to_string(),
        region: "FL".to_string(),
        available,
        availability_note: String::new(),
    }
}

fn success(hour: u32, stores: Vec<StoreStatus>) -> Snapshot {
    Snapshot::success(at(hour), "iPhone 17", stores)
}

fn recipients() -> Vec<RecipientId> {
    vec!["111".to_string(), "222".to_string()]
}

#[tokio::test]
async fn first_cycle_saves_baseline_without_notifying() {
    let source = ScriptedSource::new(vec![success(10, vec![store("A", true)])]);
    let state = MemoryStore::default();
    let sink = RecordingSink::delivering();

    let report = run_cycle(&source, &state, &sink, &recipients(), at(10)).await;

    assert!(report.fetch_succeeded());
    assert_eq!(report.decision.state, AlertState::Quiet);
    assert!(report.delivery.is_none());
    assert_eq!(report.persisted, Persisted::Saved);
    assert!(sink.messages().is_empty());
    assert_eq!(state.load().await.unwrap(), Some(success(10, vec![store("A", true)])));
}

#[tokio::test]
async fn failed_fetch_notifies_and_keeps_last_good_state() {
    let good = success(10, vec![store("A", false)]);
    let source = ScriptedSource::new(vec![
        Snapshot::failure(at(11), "iPhone 17", "request timed out"),
        success(12, vec![store("A", true)]),
    ]);
    let state = MemoryStore {
        slot: Mutex::new(Some(good.clone())),
        ..MemoryStore::default()
    };
    let sink = RecordingSink::delivering();

    let failed = run_cycle(&source, &state, &sink, &recipients(), at(11)).await;
    assert!(!failed.fetch_succeeded());
    assert_eq!(failed.persisted, Persisted::Skipped);
    assert!(failed.decision.should_notify);
    assert!(failed.delivery.as_ref().is_some_and(DeliveryReport::succeeded));
    assert_eq!(state.load().await.unwrap(), Some(good));

    // The next good sample diffs against the pre-failure state.
    let recovered = run_cycle(&source, &state, &sink, &recipients(), at(12)).await;
    let changes = recovered.decision.change_set.unwrap();
    assert!(!changes.is_first_run);
    assert_eq!(changes.became_available.len(), 1);
    assert!(recovered.decision.should_notify);
    assert_eq!(sink.messages().len(), 2);
    assert!(sink.messages()[0].contains("FETCH FAILED"));
    assert!(sink.messages()[1].contains("NOW AVAILABLE"));
}

#[tokio::test]
async fn persisted_timestamp_only_moves_forward_on_success() {
    let source = ScriptedSource::new(vec![
        success(10, vec![store("A", false)]),
        Snapshot::failure(at(11), "iPhone 17", "HTTP 503"),
        success(12, vec![store("A", false)]),
    ]);
    let state = MemoryStore::default();
    let sink = RecordingSink::delivering();

    let mut stamps = Vec::new();
    for hour in 10..=12 {
        run_cycle(&source, &state, &sink, &recipients(), at(hour)).await;
        stamps.push(state.load().await.unwrap().map(|s| s.timestamp()));
    }
    assert_eq!(stamps, vec![Some(at(10)), Some(at(10)), Some(at(12))]);
}

#[tokio::test]
async fn delivery_failure_does_not_block_persistence() {
    let source = ScriptedSource::new(vec![success(11, vec![store("A", true)])]);
    let state = MemoryStore {
        slot: Mutex::new(Some(success(10, vec![store("A", false)]))),
        ..MemoryStore::default()
    };
    let sink = RecordingSink::failing();

    let report = run_cycle(&source, &state, &sink, &recipients(), at(11)).await;

    assert!(report.fetch_succeeded());
    let delivery = report.delivery.unwrap();
    assert!(!delivery.succeeded());
    assert_eq!(delivery.failed_count(), 2);
    assert_eq!(report.persisted, Persisted::Saved);
    assert_eq!(state.load().await.unwrap().unwrap().timestamp(), at(11));
}

#[tokio::test]
async fn load_error_is_treated_as_first_run() {
    let source = ScriptedSource::new(vec![success(10, vec![store("A", true)])]);
    let state = MemoryStore {
        fail_load: true,
        ..MemoryStore::default()
    };
    let sink = RecordingSink::delivering();

    let report = run_cycle(&source, &state, &sink, &recipients(), at(10)).await;
    assert!(report.decision.change_set.unwrap().is_first_run);
    assert!(!report.decision.should_notify);
}

#[tokio::test]
async fn save_error_is_reported_not_fatal() {
    let source = ScriptedSource::new(vec![success(10, vec![store("A", true)])]);
    let state = MemoryStore {
        fail_save: true,
        ..MemoryStore::default()
    };
    let sink = RecordingSink::delivering();

    let report = run_cycle(&source, &state, &sink, &recipients(), at(10)).await;
    assert!(report.fetch_succeeded());
    assert_eq!(
        report.persisted,
        Persisted::Failed("read-only filesystem".to_string())
    );
}

#[tokio::test]
async fn unchanged_sample_stays_quiet() {
    let source = ScriptedSource::new(vec![success(11, vec![store("A", true)])]);
    let state = MemoryStore {
        slot: Mutex::new(Some(success(10, vec![store("A", true)]))),
        ..MemoryStore::default()
    };
    let sink = RecordingSink::delivering();

    let report = run_cycle(&source, &state, &sink, &recipients(), at(11)).await;
    assert!(!report.decision.should_notify);
    assert!(report.delivery.is_none());
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn default_age_reads_through_load() {
    let state = MemoryStore {
        slot: Mutex::new(Some(success(10, vec![]))),
        ..MemoryStore::default()
    };
    assert_eq!(
        state.age(at(13)).await.unwrap(),
        Some(chrono::Duration::hours(3))
    );
    state.clear().await.unwrap();
    assert_eq!(state.age(at(13)).await.unwrap(), None);
}
