//! `age` and `clear` command handlers.

use std::time::Duration;

use chrono::Utc;
use stockwatch_core::{format_age, AppConfig, StateStore};
use stockwatch_state::{FileStateStore, RunLock};

pub(crate) async fn run_age(config: &AppConfig) -> anyhow::Result<()> {
    let store = FileStateStore::new(&config.state_dir);
    match store.load().await? {
        Some(snapshot) => println!(
            "stored snapshot is {} old (taken {}, {} store(s), {} available)",
            format_age(snapshot.age_at(Utc::now())),
            snapshot.timestamp().format("%Y-%m-%d %H:%M:%S UTC"),
            snapshot.stores().len(),
            snapshot.available_count()
        ),
        None => println!("no stored snapshot at {}", store.path().display()),
    }
    Ok(())
}

pub(crate) async fn run_clear(config: &AppConfig) -> anyhow::Result<()> {
    let _lock = RunLock::acquire(
        &config.state_dir,
        Duration::from_secs(config.lock_stale_secs),
    )?;
    let store = FileStateStore::new(&config.state_dir);
    store.clear().await?;
    println!("cleared {}", store.path().display());
    Ok(())
}
