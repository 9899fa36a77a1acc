use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::binlog::position::BinlogPosition;
use common::err::mirror_error::MirrorError;
use common::err::MResult;

/// The single durable checkpoint row of one pipeline instance.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CheckpointRecord {
    pub position: BinlogPosition,
    pub saved_at: DateTime<Utc>,
}

/// Single-record store: written once before the first snapshot read, then
/// advanced only by the replayer. Durable before `save` returns.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        CheckpointStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn save(&self, position: &BinlogPosition) -> MResult<()> {
        let record = CheckpointRecord {
            position: position.clone(),
            saved_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&record)
            .map_err(|e| MirrorError::DurabilityError(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("tmp");
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
        if let Some(parent) = self.path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    pub fn load(&self) -> MResult<Option<BinlogPosition>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let record: CheckpointRecord = serde_json::from_str(&content)
            .map_err(|e| MirrorError::DurabilityError(format!("checkpoint corrupt: {}", e)))?;

        Ok(Some(record.position))
    }
}

#[cfg(test)]
mod test {
    use common::binlog::position::{BinlogPosition, Gtid};

    use super::CheckpointStore;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("mirror_checkpoint_test").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("checkpoint.json");
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn test_load_absent() {
        let store = CheckpointStore::new(temp_path("absent"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_overwrites() {
        let store = CheckpointStore::new(temp_path("overwrite"));

        store
            .save(&BinlogPosition::new("bin.000001".to_string(), 100))
            .unwrap();
        store
            .save(&BinlogPosition::new("bin.000001".to_string(), 500))
            .unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.get_file_name(), "bin.000001");
        assert_eq!(loaded.get_position(), 500);
    }

    #[test]
    fn test_gtid_round_trip() {
        let store = CheckpointStore::new(temp_path("gtid"));
        let gtid = Gtid::parse("726757ad-4455-11e8-ae04-0242ac110002:1-9").unwrap();
        let position =
            BinlogPosition::new_with_gtid("bin.000002".to_string(), 42, Some(gtid.clone()));

        store.save(&position).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, position);
        assert_eq!(loaded.get_gtid(), Some(&gtid));
    }
}
