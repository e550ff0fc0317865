use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("refusing to persist a failure snapshot")]
    FailureSnapshot,

    #[error("another stockwatch run holds the lock at {}", .path.display())]
    Locked { path: PathBuf },
}
