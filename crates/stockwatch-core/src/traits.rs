//! Seams between the cycle orchestrator and its collaborators.
//!
//! The orchestrator only ever talks to these traits; the concrete source,
//! store and sink live in their own crates.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::snapshot::Snapshot;

/// Produces the current snapshot.
///
/// Never fails at the type level: timeouts, transport errors and malformed
/// payloads are all reported as a [`Snapshot`] with a failure outcome.
#[async_trait]
pub trait FetchSource: Send + Sync {
    async fn fetch(&self) -> Snapshot;
}

/// Durable single-slot snapshot storage.
#[async_trait]
pub trait StateStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Most recently saved snapshot, or `None` if nothing usable is stored.
    async fn load(&self) -> Result<Option<Snapshot>, Self::Error>;

    /// Replace the stored snapshot atomically. Failure snapshots are rejected.
    async fn save(&self, snapshot: &Snapshot) -> Result<(), Self::Error>;

    /// Elapsed time since the stored snapshot was taken.
    async fn age(&self, now: DateTime<Utc>) -> Result<Option<Duration>, Self::Error> {
        Ok(self.load().await?.map(|s| s.age_at(now)))
    }

    /// Remove the stored snapshot. Clearing an empty store is not an error.
    async fn clear(&self) -> Result<(), Self::Error>;
}

/// Opaque recipient address (a Telegram chat id, for instance).
pub type RecipientId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RecipientOutcome {
    Delivered,
    Failed(String),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientResult {
    pub recipient: RecipientId,
    pub outcome: RecipientOutcome,
}

/// Per-recipient delivery results for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub results: Vec<RecipientResult>,
}

impl DeliveryReport {
    /// `true` when at least one recipient received the message.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.delivered_count() > 0
    }

    #[must_use]
    pub fn delivered_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == RecipientOutcome::Delivered)
            .count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, RecipientOutcome::Failed(_)))
            .count()
    }
}

/// Delivers a rendered message to each recipient independently. A failure
/// for one recipient never prevents delivery to the others.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, recipients: &[RecipientId], message: &str) -> DeliveryReport;
}
