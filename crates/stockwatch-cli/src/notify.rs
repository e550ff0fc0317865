//! Sink selection and the `test-notify` command.

use stockwatch_core::render::render_test_message;
use stockwatch_core::{AppConfig, NotificationSink, RecipientOutcome};
use stockwatch_notify::{NoopSink, TelegramSink};

/// Telegram when delivery is enabled and configured, otherwise a sink that
/// skips every recipient.
pub(crate) fn build_sink(config: &AppConfig) -> anyhow::Result<Box<dyn NotificationSink>> {
    if !config.notify_enabled {
        return Ok(Box::new(NoopSink::new("notifications disabled")));
    }
    if !config.notifications_ready() {
        tracing::warn!("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID missing; notifications will be skipped");
        return Ok(Box::new(NoopSink::new("telegram not configured")));
    }
    Ok(Box::new(TelegramSink::from_config(config)?))
}

pub(crate) async fn run_test_notify(config: &AppConfig) -> anyhow::Result<()> {
    let sink = TelegramSink::from_config(config)?;
    let bot = sink.test_connection().await?;
    println!("connected as {bot}");

    if config.telegram_chat_ids.is_empty() {
        anyhow::bail!("TELEGRAM_CHAT_ID is not set; nothing to send to");
    }

    let report = sink
        .deliver(&config.telegram_chat_ids, &render_test_message())
        .await;
    for result in &report.results {
        match &result.outcome {
            RecipientOutcome::Delivered => println!("  sent to {}", result.recipient),
            RecipientOutcome::Failed(e) | RecipientOutcome::Skipped(e) => {
                println!("  {}: {e}", result.recipient);
            }
        }
    }

    if !report.succeeded() {
        anyhow::bail!("test message reached no recipient");
    }
    Ok(())
}
