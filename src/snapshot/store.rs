//! File-backed snapshot store
//!
//! Writes go through a temp file in the target directory and an atomic
//! rename, under an exclusive fd-lock on the team's `store.lock`. Reads take
//! the shared lock.

use chrono::NaiveDate;
use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{parse_version, Snapshot, SnapshotError};

/// Lock file guarding the snapshot files of a team
const STORE_LOCK_FILE: &str = "store.lock";

/// Maximum snapshot size read back (256 MiB)
const MAX_SNAPSHOT_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Snapshot store rooted at a directory
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    root: PathBuf,
}

impl FileSnapshotStore {
    /// Store under `root`; directories are created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the snapshots of `team_id`
    pub fn team_dir(&self, team_id: &str) -> Result<PathBuf, SnapshotError> {
        let valid = !team_id.is_empty()
            && team_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(SnapshotError::InvalidTeamId(team_id.to_string()));
        }
        Ok(self.root.join(team_id))
    }

    /// File of one version
    pub fn snapshot_path(&self, team_id: &str, version: &str) -> Result<PathBuf, SnapshotError> {
        Ok(self.team_dir(team_id)?.join(format!("{version}.json")))
    }

    /// Atomically write a snapshot, replacing any previous content of the version
    pub fn save(&self, team_id: &str, version: &str, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let dir = self.team_dir(team_id)?;
        let path = self.snapshot_path(team_id, version)?;
        std::fs::create_dir_all(&dir).map_err(|e| SnapshotError::IoError(e.to_string()))?;

        let json = serde_json::to_vec(snapshot)
            .map_err(|e| SnapshotError::SerializationError(e.to_string()))?;

        let mut lock = RwLock::new(open_lock_file(&dir)?);
        let _guard = lock
            .write()
            .map_err(|e| SnapshotError::LockError(format!("Failed to acquire write lock: {e}")))?;

        let mut temp_file = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| SnapshotError::IoError(format!("Failed to create temp file: {e}")))?;
        temp_file
            .write_all(&json)
            .map_err(|e| SnapshotError::IoError(format!("Failed to write to temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| SnapshotError::IoError(format!("Failed to sync temp file: {e}")))?;
        temp_file
            .persist(&path)
            .map_err(|e| SnapshotError::IoError(format!("Failed to persist temp file: {e}")))?;

        debug!(
            path = %path.display(),
            status = ?snapshot.status,
            bytes = json.len(),
            "Snapshot saved"
        );
        Ok(())
    }

    /// Read one version, `None` when it does not exist
    pub fn load(&self, team_id: &str, version: &str) -> Result<Option<Snapshot>, SnapshotError> {
        let dir = self.team_dir(team_id)?;
        let path = self.snapshot_path(team_id, version)?;
        if !path.exists() {
            return Ok(None);
        }

        let lock = RwLock::new(open_lock_file(&dir)?);
        let _guard = lock
            .read()
            .map_err(|e| SnapshotError::LockError(format!("Failed to acquire read lock: {e}")))?;

        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SnapshotError::IoError(e.to_string())),
        };
        if metadata.len() > MAX_SNAPSHOT_FILE_SIZE {
            return Err(SnapshotError::IoError(format!(
                "snapshot {} too large: {} bytes (max: {MAX_SNAPSHOT_FILE_SIZE} bytes)",
                path.display(),
                metadata.len()
            )));
        }

        let contents = std::fs::read(&path).map_err(|e| SnapshotError::IoError(e.to_string()))?;
        let snapshot = serde_json::from_slice(&contents).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to deserialize snapshot");
            SnapshotError::DeserializationError(e.to_string())
        })?;
        Ok(Some(snapshot))
    }

    /// Stored versions of a team, oldest first
    pub fn versions(&self, team_id: &str) -> Result<Vec<String>, SnapshotError> {
        let dir = self.team_dir(team_id)?;
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SnapshotError::IoError(e.to_string())),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SnapshotError::IoError(e.to_string()))?;
            let name = entry.file_name();
            let Some(version) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if parse_version(version).is_some() {
                versions.push(version.to_string());
            }
        }
        versions.sort();
        Ok(versions)
    }

    /// Newest version and its snapshot
    pub fn latest(&self, team_id: &str) -> Result<Option<(String, Snapshot)>, SnapshotError> {
        for version in self.versions(team_id)?.into_iter().rev() {
            if let Some(snapshot) = self.load(team_id, &version)? {
                return Ok(Some((version, snapshot)));
            }
        }
        Ok(None)
    }

    /// Delete versions beyond the newest `keep_last` and versions older than `max_age_days`
    ///
    /// The newest version is always kept, whatever the retention settings.
    /// Returns the deleted versions, oldest first.
    pub fn prune(
        &self,
        team_id: &str,
        keep_last: usize,
        max_age_days: i64,
        today: NaiveDate,
    ) -> Result<Vec<String>, SnapshotError> {
        let versions = self.versions(team_id)?;
        let keep_from = versions.len().saturating_sub(keep_last.max(1));
        let newest = versions.len().saturating_sub(1);

        let doomed: Vec<String> = versions
            .into_iter()
            .enumerate()
            .filter(|(i, version)| {
                let too_old = parse_version(version)
                    .is_some_and(|date| (today - date).num_days() > max_age_days);
                *i != newest && (*i < keep_from || too_old)
            })
            .map(|(_, version)| version)
            .collect();

        if doomed.is_empty() {
            return Ok(doomed);
        }

        let dir = self.team_dir(team_id)?;
        let mut lock = RwLock::new(open_lock_file(&dir)?);
        let _guard = lock
            .write()
            .map_err(|e| SnapshotError::LockError(format!("Failed to acquire write lock: {e}")))?;

        for version in &doomed {
            let path = self.snapshot_path(team_id, version)?;
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(SnapshotError::IoError(e.to_string())),
            }
        }

        info!(team_id = team_id, pruned = ?doomed, "Pruned old snapshots");
        Ok(doomed)
    }
}

fn open_lock_file(dir: &Path) -> Result<File, SnapshotError> {
    std::fs::create_dir_all(dir).map_err(|e| SnapshotError::IoError(e.to_string()))?;
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(dir.join(STORE_LOCK_FILE))
        .map_err(|e| SnapshotError::LockError(format!("Failed to open lock file: {e}")))
}
