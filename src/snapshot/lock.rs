//! Single-flight export lock
//!
//! Add-if-absent semantics on a lock file: the lock body is written to a
//! temporary file in the team directory and moved into place without
//! clobbering, so the lock never appears half written. A lock past its expiry
//! is taken over; an unreadable one only once its mtime is older than the TTL.
//! Dropping the [`ExportLock`] removes the file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::SnapshotError;

/// Lock file name inside the team directory
pub const EXPORT_LOCK_FILE: &str = "export.lock";

/// Default lifetime of an export lock
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    acquired_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Held export lock of one team
#[derive(Debug)]
pub struct ExportLock {
    path: PathBuf,
    expires_at: DateTime<Utc>,
}

impl ExportLock {
    /// Try to take the lock in `team_dir`
    ///
    /// Returns `Ok(None)` when another holder owns an unexpired lock.
    pub fn try_acquire(team_dir: &Path, ttl: Duration) -> Result<Option<Self>, SnapshotError> {
        Self::try_acquire_at(team_dir, ttl, Utc::now())
    }

    fn try_acquire_at(
        team_dir: &Path,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, SnapshotError> {
        std::fs::create_dir_all(team_dir).map_err(|e| SnapshotError::IoError(e.to_string()))?;
        let path = team_dir.join(EXPORT_LOCK_FILE);
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| SnapshotError::LockError(format!("invalid lock TTL: {e}")))?;

        let info = LockInfo {
            pid: std::process::id(),
            acquired_at: now,
            expires_at: now + ttl,
        };
        let json = serde_json::to_vec(&info)
            .map_err(|e| SnapshotError::SerializationError(e.to_string()))?;

        // Second pass only after removing an expired lock
        for _ in 0..2 {
            let mut temp = NamedTempFile::new_in(team_dir)
                .map_err(|e| SnapshotError::LockError(format!("Failed to create temp lock: {e}")))?;
            temp.write_all(&json)
                .and_then(|_| temp.as_file().sync_all())
                .map_err(|e| SnapshotError::LockError(format!("Failed to write lock file: {e}")))?;

            match temp.persist_noclobber(&path) {
                Ok(_) => {
                    debug!(path = %path.display(), expires_at = %info.expires_at, "Export lock acquired");
                    return Ok(Some(Self {
                        path,
                        expires_at: info.expires_at,
                    }));
                }
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    if !Self::is_stale(&path, now, ttl) {
                        debug!(path = %path.display(), "Export lock held elsewhere");
                        return Ok(None);
                    }
                    warn!(path = %path.display(), "Taking over expired export lock");
                    match std::fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => return Err(SnapshotError::LockError(e.to_string())),
                    }
                }
                Err(e) => {
                    return Err(SnapshotError::LockError(format!(
                        "Failed to create lock file: {}",
                        e.error
                    )))
                }
            }
        }

        Ok(None)
    }

    fn is_stale(path: &Path, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        let contents = match std::fs::read(path) {
            Ok(contents) => contents,
            // Released between our create attempt and the read
            Err(e) if e.kind() == ErrorKind::NotFound => return true,
            Err(_) => return Self::older_than(path, now, ttl),
        };
        match serde_json::from_slice::<LockInfo>(&contents) {
            Ok(info) => info.expires_at <= now,
            Err(_) => Self::older_than(path, now, ttl),
        }
    }

    /// Whether the file at `path` was last modified more than `ttl` before `now`
    fn older_than(path: &Path, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        let modified: Option<SystemTime> = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        match modified {
            Some(modified) => DateTime::<Utc>::from(modified) + ttl <= now,
            None => false,
        }
    }

    /// Lock file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the lock stops excluding other holders
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Release the lock
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ExportLock {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Export lock released"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to release export lock"),
        }
    }
}
