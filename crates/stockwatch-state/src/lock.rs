use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::StateError;

/// Lock file name inside the state directory.
pub const LOCK_FILE: &str = "stockwatch.lock";

/// Exclusive run lock over a state directory, released on drop.
///
/// The lock file holds `"<pid> <token>"`. The pid lets a later run tell a
/// live holder from a dead one; the token lets a guard recognise its own
/// file, so dropping a guard whose lock was reclaimed leaves the new
/// holder's file alone.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    owner: String,
}

impl RunLock {
    /// Create `<dir>/stockwatch.lock` exclusively, creating `dir` if needed.
    ///
    /// An existing lock is reclaimed only when it is older than
    /// `stale_after` and its holder is not a live process. Where liveness
    /// cannot be checked, age alone decides.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Locked`] if a live lock exists, or
    /// [`StateError::Io`] on filesystem errors.
    pub fn acquire(dir: &Path, stale_after: Duration) -> Result<Self, StateError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE);
        let owner = owner_token();

        match create_exclusive(&path, &owner) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !is_reclaimable(&path, stale_after)? {
                    return Err(StateError::Locked { path });
                }
                tracing::warn!(path = %path.display(), "reclaiming stale run lock");
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(StateError::Io(e)),
                }
                create_exclusive(&path, &owner).map_err(|e| {
                    if e.kind() == ErrorKind::AlreadyExists {
                        StateError::Locked { path: path.clone() }
                    } else {
                        StateError::Io(e)
                    }
                })?;
            }
            Err(e) => return Err(StateError::Io(e)),
        }

        tracing::debug!(path = %path.display(), "run lock acquired");
        Ok(Self { path, owner })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim() == self.owner => {}
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "run lock was taken over; leaving it in place");
                return;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read run lock");
                return;
            }
        }
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "run lock released"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to release run lock");
            }
        }
    }
}

fn owner_token() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    format!("{} {nanos}", std::process::id())
}

fn create_exclusive(path: &Path, owner: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{owner}")?;
    file.sync_all()
}

fn is_reclaimable(path: &Path, stale_after: Duration) -> Result<bool, StateError> {
    let (modified, contents) = match fs::metadata(path) {
        Ok(meta) => (meta.modified()?, fs::read_to_string(path).unwrap_or_default()),
        // Released between our create attempt and now.
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(StateError::Io(e)),
    };
    let old = SystemTime::now()
        .duration_since(modified)
        .is_ok_and(|age| age > stale_after);
    if !old {
        return Ok(false);
    }

    let holder = contents
        .split_whitespace()
        .next()
        .and_then(|pid| pid.parse::<u32>().ok());
    match holder.and_then(process_alive) {
        Some(true) => {
            tracing::warn!(
                path = %path.display(),
                pid = holder.unwrap_or_default(),
                "run lock is past its stale threshold but its holder is still running"
            );
            Ok(false)
        }
        Some(false) | None => Ok(true),
    }
}

/// `None` when liveness cannot be determined on this platform.
#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> Option<bool> {
    Some(Path::new("/proc").join(pid.to_string()).exists())
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> Option<bool> {
    None
}
