use async_trait::async_trait;
use stockwatch_core::{
    DeliveryReport, NotificationSink, RecipientId, RecipientOutcome, RecipientResult,
};

/// Sink used when delivery is disabled; every recipient is reported skipped.
#[derive(Debug, Clone, Default)]
pub struct NoopSink {
    reason: String,
}

impl NoopSink {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for NoopSink {
    async fn deliver(&self, recipients: &[RecipientId], message: &str) -> DeliveryReport {
        tracing::info!(
            recipients = recipients.len(),
            bytes = message.len(),
            reason = %self.reason,
            "notification skipped"
        );
        DeliveryReport {
            results: recipients
                .iter()
                .map(|r| RecipientResult {
                    recipient: r.clone(),
                    outcome: RecipientOutcome::Skipped(self.reason.clone()),
                })
                .collect(),
        }
    }
}
