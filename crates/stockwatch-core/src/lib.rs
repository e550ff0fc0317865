//! Core sampling/diff/alert engine for stockwatch.
//!
//! Holds the availability snapshot model, the pure diff engine and alert
//! policy, the contracts implemented by the fetch source, state store and
//! notification sink crates, and the cycle that wires them together.

pub mod alert;
pub mod app_config;
pub mod config;
pub mod cycle;
pub mod diff;
pub mod render;
pub mod snapshot;
pub mod traits;

use thiserror::Error;

pub use alert::{evaluate, evaluate_failure, AlertDecision, AlertState};
pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use cycle::{run_cycle, CycleReport, Persisted};
pub use diff::{diff, ChangeSet, Partition};
pub use render::format_age;
pub use snapshot::{Outcome, Snapshot, StoreStatus};
pub use traits::{
    DeliveryReport, FetchSource, NotificationSink, RecipientId, RecipientOutcome,
    RecipientResult, StateStore,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
