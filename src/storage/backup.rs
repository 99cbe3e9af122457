//! Backup manager: timestamped snapshots of the live data file.
//!
//! Every save copies the current live file into the backup directory under a
//! name carrying a sortable timestamp token, then prunes the set down to the
//! retention count. Snapshots are never modified after they are written.

use crate::core::{Result, StoreError, Task};
use crate::storage::codec;
use crate::storage::retention::RetentionSet;
use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};
use futures::future::join_all;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

pub const BACKUP_PREFIX: &str = "tasks-backup-";
pub const BACKUP_EXTENSION: &str = ".json";
pub const DEFAULT_RETENTION: usize = 10;

const TOKEN_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";

lazy_static! {
    static ref SNAPSHOT_NAME: Regex = Regex::new(
        r"^tasks-backup-(\d{4})-(\d{2})-(\d{2})T(\d{2})-(\d{2})-(\d{2})-(\d{3})Z\.json$"
    )
    .unwrap();
}

// ============================================================================
// Snapshot identifiers
// ============================================================================

/// File name of a snapshot, e.g. `tasks-backup-2025-07-15T10-00-00-123Z.json`.
///
/// Ids order lexicographically in creation order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    /// Accept only well-formed snapshot names. Anything else (including path
    /// separators) is rejected, so an id can never address a file outside the
    /// backup directory.
    pub fn parse(name: &str) -> Option<Self> {
        SNAPSHOT_NAME
            .is_match(name)
            .then(|| Self(name.to_string()))
            .filter(|id| id.created_at().is_some())
    }

    fn from_timestamp(ts: DateTime<Utc>) -> Self {
        Self(format!(
            "{}{}{}",
            BACKUP_PREFIX,
            ts.format(TOKEN_FORMAT),
            BACKUP_EXTENSION
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time encoded in the name.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let caps = SNAPSHOT_NAME.captures(&self.0)?;
        let field = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
        let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
        let naive = NaiveDate::from_ymd_opt(year, field(2)?, field(3)?)?
            .and_hms_milli_opt(field(4)?, field(5)?, field(6)?, field(7)?)?;
        Some(naive.and_utc())
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of [`BackupManager::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub id: SnapshotId,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Backup manager
// ============================================================================

#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_dir: PathBuf,
    retention: usize,
    durable: bool,
}

impl BackupManager {
    pub fn new<P: AsRef<Path>>(backup_dir: P, retention: usize) -> Self {
        Self {
            backup_dir: backup_dir.as_ref().to_path_buf(),
            retention,
            durable: true,
        }
    }

    /// Skip fsync of snapshot files (tests, throwaway stores).
    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.backup_dir).await.map_err(|err| {
            StoreError::storage(format!(
                "create backup directory '{}': {}",
                self.backup_dir.display(),
                err
            ))
        })
    }

    pub fn path_of(&self, id: &SnapshotId) -> PathBuf {
        self.backup_dir.join(id.as_str())
    }

    /// Copy the live file into a new snapshot.
    ///
    /// Returns `Ok(None)` when the live file does not exist yet. The new id is
    /// always strictly greater than every existing one, even if the clock
    /// has not advanced since the previous snapshot.
    pub async fn snapshot(&self, live_file: &Path) -> Result<Option<SnapshotId>> {
        if !fs::try_exists(live_file).await? {
            debug!(path = %live_file.display(), "no live file yet, skipping snapshot");
            return Ok(None);
        }
        self.ensure_dir().await?;

        // Tokens carry milliseconds; compare at that precision.
        let mut ts = Utc::now().trunc_subsecs(3);
        if let Some(newest) = self.snapshot_ids().await?.first().and_then(|id| id.created_at()) {
            if ts <= newest {
                ts = newest + Duration::milliseconds(1);
            }
        }
        let id = SnapshotId::from_timestamp(ts);
        let target = self.path_of(&id);
        let tmp_path = self.backup_dir.join(format!("{}.tmp", id));

        let stage = async {
            fs::copy(live_file, &tmp_path).await?;
            if self.durable {
                fs::File::open(&tmp_path).await?.sync_all().await?;
            }
            fs::rename(&tmp_path, &target).await
        };

        if let Err(err) = stage.await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::storage(format!("write snapshot {}: {}", id, err)));
        }

        info!(snapshot = %id, "created backup snapshot");
        Ok(Some(id))
    }

    /// Delete every snapshot beyond the newest `retention`.
    ///
    /// Best-effort: failures are logged and never returned. Returns how many
    /// snapshots were removed.
    pub async fn prune(&self, retention: usize) -> usize {
        let ids = match self.snapshot_ids().await {
            Ok(ids) => ids,
            Err(err) => {
                warn!(error = %err, "failed to list backups for pruning");
                return 0;
            }
        };

        let mut window = RetentionSet::with_keys(retention, ids);
        let evicted = window.evict_excess();
        debug!(kept = window.len(), evicted = evicted.len(), "pruning backups");
        let mut removed = 0;
        for id in evicted {
            match fs::remove_file(self.path_of(&id)).await {
                Ok(()) => {
                    debug!(snapshot = %id, "pruned backup snapshot");
                    removed += 1;
                }
                Err(err) => warn!(snapshot = %id, error = %err, "failed to prune backup snapshot"),
            }
        }
        removed
    }

    /// Prune with the configured retention count.
    pub async fn prune_default(&self) -> usize {
        self.prune(self.retention).await
    }

    /// All snapshot ids, newest first. A missing backup directory has none.
    pub async fn snapshot_ids(&self) -> Result<Vec<SnapshotId>> {
        let mut entries = match fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(id) = entry.file_name().to_str().and_then(SnapshotId::parse) {
                ids.push(id);
            }
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    /// Snapshot metadata, newest first.
    ///
    /// A snapshot pruned by a concurrent save between listing the directory
    /// and reading its metadata is left out rather than failing the listing.
    pub async fn list(&self) -> Result<Vec<BackupInfo>> {
        let ids = self.snapshot_ids().await?;
        let entries = join_all(ids.into_iter().map(|id| async move {
            match fs::metadata(self.path_of(&id)).await {
                Ok(meta) => Ok(Some(BackupInfo {
                    created_at: id.created_at().unwrap_or_else(Utc::now),
                    size: meta.len(),
                    id,
                })),
                Err(err) if err.kind() == IoErrorKind::NotFound => Ok(None),
                Err(err) => Err(StoreError::from(err)),
            }
        }))
        .await;

        entries
            .into_iter()
            .filter_map(|entry| entry.transpose())
            .collect()
    }

    /// Raw bytes of a snapshot.
    pub async fn read(&self, id: &str) -> Result<Vec<u8>> {
        let id = SnapshotId::parse(id)
            .ok_or_else(|| StoreError::not_found(format!("Backup file not found: {}", id)))?;
        match fs::read(self.path_of(&id)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == IoErrorKind::NotFound => Err(StoreError::not_found(
                format!("Backup file not found: {}", id),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Decode a snapshot into its record collection.
    pub async fn restore(&self, id: &str) -> Result<Vec<Task>> {
        let bytes = self.read(id).await?;
        codec::decode(&bytes)
    }
}
