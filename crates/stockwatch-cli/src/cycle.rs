//! `run`, `watch` and `dry-run` command handlers.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use stockwatch_core::{
    diff, evaluate, run_cycle, AppConfig, CycleReport, FetchSource, Persisted, RecipientOutcome,
    StateStore,
};
use stockwatch_scraper::FulfillmentSource;
use stockwatch_state::{FileStateStore, RunLock};
use tokio::time::MissedTickBehavior;

use crate::notify::build_sink;

fn acquire_lock(config: &AppConfig) -> anyhow::Result<RunLock> {
    Ok(RunLock::acquire(
        &config.state_dir,
        Duration::from_secs(config.lock_stale_secs),
    )?)
}

async fn cycle_once(config: &AppConfig) -> anyhow::Result<CycleReport> {
    let store = FileStateStore::open(&config.state_dir).await?;
    let source = FulfillmentSource::from_config(config)?;
    let sink = build_sink(config)?;
    Ok(run_cycle(
        &source,
        &store,
        sink.as_ref(),
        &config.telegram_chat_ids,
        Utc::now(),
    )
    .await)
}

fn print_report(report: &CycleReport) {
    match report.snapshot.failure_reason() {
        Some(reason) => println!("fetch failed: {reason}"),
        None => {
            let summary = report
                .decision
                .change_set
                .as_ref()
                .map_or("", |c| c.summary.as_str());
            println!(
                "{}: {} available / {} unavailable; {summary}",
                report.snapshot.product_label(),
                report.snapshot.available_count(),
                report.snapshot.unavailable_count()
            );
        }
    }

    match &report.delivery {
        Some(delivery) => {
            for result in &delivery.results {
                match &result.outcome {
                    RecipientOutcome::Delivered => println!("  notified {}", result.recipient),
                    RecipientOutcome::Failed(e) => {
                        println!("  failed to notify {}: {e}", result.recipient);
                    }
                    RecipientOutcome::Skipped(why) => {
                        println!("  skipped {}: {why}", result.recipient);
                    }
                }
            }
            if delivery.results.is_empty() {
                println!("  no recipients configured");
            }
        }
        None => println!("  no notification needed"),
    }

    match &report.persisted {
        Persisted::Saved => println!("  state saved"),
        Persisted::Skipped => println!("  state left unchanged"),
        Persisted::Failed(e) => println!("  failed to save state: {e}"),
    }
}

/// Run a single cycle. Fails (non-zero exit) iff the fetch failed.
pub(crate) async fn run_once(config: &AppConfig) -> anyhow::Result<()> {
    let _lock = acquire_lock(config)?;
    let report = cycle_once(config).await?;
    print_report(&report);

    if let Some(reason) = report.snapshot.failure_reason() {
        anyhow::bail!("availability fetch failed: {reason}");
    }
    Ok(())
}

/// Run cycles every `interval_secs` until Ctrl-C. Cycles never overlap: a
/// slow cycle causes missed ticks to be skipped, not queued.
///
/// The run lock is taken per cycle, so a `run` from cron can slot in between
/// ticks. A tick that finds the lock held is skipped.
pub(crate) async fn run_watch(config: &AppConfig, interval_secs: u64) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = crate::shutdown_signal();
    tokio::pin!(shutdown);

    tracing::info!(interval_secs, "watch started");
    println!("watching every {interval_secs}s; press Ctrl-C to stop");

    let mut cycles: u64 = 0;
    let mut failures: u64 = 0;
    let mut skipped: u64 = 0;
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = interval.tick() => {
                let _lock = match acquire_lock(config) {
                    Ok(lock) => lock,
                    Err(e) => {
                        skipped += 1;
                        tracing::warn!(error = %e, "run lock unavailable; skipping this tick");
                        continue;
                    }
                };
                cycles += 1;
                match cycle_once(config).await {
                    Ok(report) => {
                        if !report.fetch_succeeded() {
                            failures += 1;
                        }
                        println!("[{}] cycle {cycles}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
                        print_report(&report);
                    }
                    Err(e) => {
                        failures += 1;
                        tracing::error!(error = %e, cycle = cycles, "cycle could not start");
                    }
                }
            }
        }
    }

    println!("watch stopped after {cycles} cycle(s), {failures} failed, {skipped} tick(s) skipped");
    Ok(())
}

/// Fetch and diff against stored state without notifying or saving.
pub(crate) async fn run_dry(config: &AppConfig, output: Option<&Path>) -> anyhow::Result<()> {
    let store = FileStateStore::new(&config.state_dir);
    let source = FulfillmentSource::from_config(config)?;

    let current = source.fetch().await;
    if let Some(path) = output {
        let json = serde_json::to_vec_pretty(&current)?;
        tokio::fs::write(path, json).await?;
        println!("snapshot written to {}", path.display());
    }

    let now = Utc::now();
    let previous = store.load().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not load previous snapshot; treating as first run");
        None
    });
    let previous_age = previous.as_ref().map(|p| p.age_at(now));
    let changes = diff(previous.as_ref(), &current);
    let decision = evaluate(&current, changes, previous_age);

    println!("dry-run: would notify = {}", decision.should_notify);
    println!("{}", decision.rendered_message);

    if let Some(reason) = current.failure_reason() {
        anyhow::bail!("availability fetch failed: {reason}");
    }
    Ok(())
}
