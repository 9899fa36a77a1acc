use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use common::err::mirror_error::MirrorError;
use common::err::MResult;

#[allow(non_camel_case_types)]
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum MigrationStatus {
    PENDING,
    IN_PROGRESS,
    COMPLETED,
    FAILED,
}

/// Snapshot cursor of one table.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SnapshotProgress {
    pub table_name: String,
    pub total_rows: u64,
    pub migrated_rows: u64,

    /// Textual form of the highest copied primary key. `None` when the table
    /// has no resumable cursor.
    pub last_pk_value: Option<String>,

    pub status: MigrationStatus,

    pub start_time: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
    pub complete_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl SnapshotProgress {
    fn new(table_name: &str, total_rows: u64) -> Self {
        let now = Utc::now();
        SnapshotProgress {
            table_name: table_name.to_string(),
            total_rows,
            migrated_rows: 0,
            last_pk_value: None,
            status: MigrationStatus::PENDING,
            start_time: now,
            last_update_time: now,
            complete_time: None,
            error_message: None,
        }
    }
}

/// Durable per-table snapshot cursors, keyed by table name.
///
/// One JSON file, atomically replaced and fsynced on every mutation. One
/// writer (the snapshot worker); readers may observe any prior durable state.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    records: BTreeMap<String, SnapshotProgress>,
}

impl ProgressStore {
    pub fn open<P: AsRef<Path>>(path: P) -> MResult<Self> {
        let path = path.as_ref().to_path_buf();

        let records = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)
                .map_err(|e| MirrorError::DurabilityError(format!("progress store corrupt: {}", e)))?
        } else {
            BTreeMap::new()
        };

        Ok(ProgressStore { path, records })
    }

    /// Begins (or resumes) a table copy.
    ///
    /// Creates the record when absent; a COMPLETED record is reset to a fresh
    /// cursor first. The record leaves as IN_PROGRESS either way.
    pub fn start(&mut self, table: &str, total_rows: u64) -> MResult<SnapshotProgress> {
        let record = self
            .records
            .entry(table.to_string())
            .or_insert_with(|| SnapshotProgress::new(table, total_rows));

        if record.status == MigrationStatus::COMPLETED {
            *record = SnapshotProgress::new(table, total_rows);
        }

        record.status = MigrationStatus::IN_PROGRESS;
        record.total_rows = total_rows;
        record.last_update_time = Utc::now();

        let snapshot = record.clone();
        self.persist()?;
        Ok(snapshot)
    }

    /// Advances the cursor without touching status. Safe at any frequency.
    pub fn update(
        &mut self,
        table: &str,
        migrated_rows: u64,
        last_pk: Option<String>,
    ) -> MResult<()> {
        let record = self.require(table)?;
        record.migrated_rows = migrated_rows;
        if last_pk.is_some() {
            record.last_pk_value = last_pk;
        }
        record.last_update_time = Utc::now();

        self.persist()
    }

    pub fn complete(&mut self, table: &str) -> MResult<()> {
        let record = self.require(table)?;
        record.status = MigrationStatus::COMPLETED;
        record.complete_time = Some(Utc::now());
        record.last_update_time = Utc::now();

        self.persist()
    }

    pub fn fail(&mut self, table: &str, error: &str) -> MResult<()> {
        let record = self.require(table)?;
        record.status = MigrationStatus::FAILED;
        record.error_message = Some(error.to_string());
        record.last_update_time = Utc::now();

        self.persist()
    }

    pub fn get(&self, table: &str) -> Option<&SnapshotProgress> {
        self.records.get(table)
    }

    pub fn get_all(&self) -> Vec<&SnapshotProgress> {
        self.records.values().collect()
    }

    pub fn get_incomplete(&self) -> Vec<&SnapshotProgress> {
        self.records
            .values()
            .filter(|r| r.status != MigrationStatus::COMPLETED)
            .collect()
    }

    /// Operator action: puts a (typically FAILED) table back to PENDING with
    /// a fresh cursor.
    pub fn reset(&mut self, table: &str) -> MResult<()> {
        if let Some(record) = self.records.get_mut(table) {
            let total = record.total_rows;
            *record = SnapshotProgress::new(table, total);
            info!("progress for table {} reset", table);
        }

        self.persist()
    }

    pub fn clear_all(&mut self) -> MResult<()> {
        self.records.clear();
        self.persist()
    }

    fn require(&mut self, table: &str) -> MResult<&mut SnapshotProgress> {
        self.records.get_mut(table).ok_or_else(|| {
            MirrorError::DurabilityError(format!("no progress record for table {}", table))
        })
    }

    /// Atomic replace + fsync. A failed write is fatal to the caller: resume
    /// after a torn cursor would re-copy or skip rows.
    fn persist(&self) -> MResult<()> {
        let content = serde_json::to_string_pretty(&self.records)
            .map_err(|e| MirrorError::DurabilityError(e.to_string()))?;

        let tmp_path = self.path.with_extension("tmp");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut tmp = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|e| MirrorError::DurabilityError(e.to_string()))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| MirrorError::DurabilityError(e.to_string()))?;
        tmp.sync_all()
            .map_err(|e| MirrorError::DurabilityError(e.to_string()))?;

        fs::rename(&tmp_path, &self.path).map_err(|e| MirrorError::DurabilityError(e.to_string()))?;
        sync_dir(&self.path);

        Ok(())
    }
}

fn sync_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(test)]
mod test {
    use super::{MigrationStatus, ProgressStore};

    fn temp_store(name: &str) -> ProgressStore {
        let dir = std::env::temp_dir().join("mirror_progress_test").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("progress.json");
        let _ = std::fs::remove_file(&path);
        ProgressStore::open(path).unwrap()
    }

    #[test]
    fn test_start_creates_in_progress() {
        let mut store = temp_store("start");
        let record = store.start("users", 5).unwrap();
        assert_eq!(record.status, MigrationStatus::IN_PROGRESS);
        assert_eq!(record.total_rows, 5);
        assert_eq!(record.migrated_rows, 0);
    }

    #[test]
    fn test_update_keeps_status() {
        let mut store = temp_store("update");
        store.start("users", 5).unwrap();
        store.update("users", 3, Some("3".to_string())).unwrap();

        let record = store.get("users").unwrap();
        assert_eq!(record.status, MigrationStatus::IN_PROGRESS);
        assert_eq!(record.migrated_rows, 3);
        assert_eq!(record.last_pk_value.as_deref(), Some("3"));
    }

    #[test]
    fn test_complete_and_restart_resets() {
        let mut store = temp_store("complete");
        store.start("users", 5).unwrap();
        store.update("users", 5, Some("5".to_string())).unwrap();
        store.complete("users").unwrap();
        assert_eq!(store.get("users").unwrap().status, MigrationStatus::COMPLETED);

        // start over a COMPLETED table yields a fresh cursor
        let record = store.start("users", 6).unwrap();
        assert_eq!(record.migrated_rows, 0);
        assert_eq!(record.last_pk_value, None);
        assert_eq!(record.status, MigrationStatus::IN_PROGRESS);
    }

    #[test]
    fn test_fail_and_reset() {
        let mut store = temp_store("fail");
        store.start("users", 5).unwrap();
        store.fail("users", "duplicate entry").unwrap();

        let record = store.get("users").unwrap();
        assert_eq!(record.status, MigrationStatus::FAILED);
        assert_eq!(record.error_message.as_deref(), Some("duplicate entry"));

        store.reset("users").unwrap();
        assert_eq!(store.get("users").unwrap().status, MigrationStatus::PENDING);
    }

    #[test]
    fn test_durable_across_reopen() {
        let dir = std::env::temp_dir().join("mirror_progress_test").join("reopen");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("progress.json");
        let _ = std::fs::remove_file(&path);

        {
            let mut store = ProgressStore::open(&path).unwrap();
            store.start("users", 5).unwrap();
            store.update("users", 3, Some("3".to_string())).unwrap();
        }

        let store = ProgressStore::open(&path).unwrap();
        let record = store.get("users").unwrap();
        assert_eq!(record.migrated_rows, 3);
        assert_eq!(record.last_pk_value.as_deref(), Some("3"));
    }

    #[test]
    fn test_get_incomplete() {
        let mut store = temp_store("incomplete");
        store.start("users", 5).unwrap();
        store.start("orders", 2).unwrap();
        store.complete("orders").unwrap();

        let incomplete = store.get_incomplete();
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].table_name, "users");
    }

    #[test]
    fn test_clear_all() {
        let mut store = temp_store("clear");
        store.start("users", 5).unwrap();
        store.clear_all().unwrap();
        assert!(store.get_all().is_empty());
    }
}
