use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::err::mirror_error::MirrorError;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 5000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    app_name: String,

    pub source: DbConfig,
    pub target: DbConfig,
    pub migration: MigrationConfig,
    pub checkpoint: CheckpointConfig,
    pub journal: JournalConfig,
    pub base: BaseConfig,
}

/// One MySQL endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub host: Option<String>,
    pub port: Option<i16>,
    pub database: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Rows per insert batch.
    pub batch_size: usize,

    /// Drop-before-create in the schema phase.
    pub drop_tables: bool,
    /// Execute the schema phase.
    pub create_tables: bool,
    /// Execute the data phase.
    pub migrate_data: bool,

    /// Skip failed batches instead of marking the table FAILED.
    pub continue_on_error: bool,
    /// Use the progress store to resume a partial copy.
    pub enable_resume: bool,
    /// Tail the binlog after the snapshot.
    pub enable_incremental: bool,

    /// Where decoded events go: "journal" (file journal + replayer) or
    /// "direct" (apply straight to the target).
    pub sink_mode: String,

    /// Comma-separated allow-lists. Empty means all.
    pub included_databases: String,
    pub included_tables: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Filesystem path of the checkpoint store.
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Directory the tail sink appends to and the replayer scans.
    pub directory: String,

    /// Replayer poll interval.
    pub scan_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseConfig {
    /// 日志输出路径
    log_dir: Option<String>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        MirrorConfig {
            app_name: String::from("mysql-mirror"),
            source: DbConfig::default(),
            target: DbConfig::default(),
            migration: MigrationConfig::default(),
            checkpoint: CheckpointConfig::default(),
            journal: JournalConfig::default(),
            base: BaseConfig::default(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            host: Some("127.0.0.1".to_string()),
            port: Some(3306),
            database: "".to_string(),
            username: "root".to_string(),
            password: "".to_string(),
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        MigrationConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            drop_tables: false,
            create_tables: true,
            migrate_data: true,
            continue_on_error: false,
            enable_resume: true,
            enable_incremental: false,
            sink_mode: "journal".to_string(),
            included_databases: "".to_string(),
            included_tables: "".to_string(),
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        CheckpointConfig {
            db_path: "/tmp/mirror/checkpoint.json".to_string(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        JournalConfig {
            directory: "/tmp/mirror/journal".to_string(),
            scan_interval_ms: DEFAULT_SCAN_INTERVAL_MS,
        }
    }
}

impl Default for BaseConfig {
    fn default() -> Self {
        BaseConfig {
            log_dir: Some(String::from("/tmp/mirror/logs")),
        }
    }
}

impl MirrorConfig {
    pub fn get_app_name(&self) -> &str {
        &self.app_name
    }
}

impl DbConfig {
    pub fn get_host(&self) -> &str {
        match self.host.as_ref() {
            None => "127.0.0.1",
            Some(h) => h.as_str(),
        }
    }

    pub fn get_port(&self) -> i16 {
        self.port.unwrap_or(3306)
    }
}

impl MigrationConfig {
    pub fn is_direct_sink(&self) -> bool {
        self.sink_mode.eq_ignore_ascii_case("direct")
    }

    pub fn included_database_list(&self) -> Vec<String> {
        split_csv(&self.included_databases)
    }

    pub fn included_table_list(&self) -> Vec<String> {
        split_csv(&self.included_tables)
    }
}

impl BaseConfig {
    pub fn get_log_dir(&self) -> Option<String> {
        self.log_dir.clone()
    }
}

/// 读取指定路径下的配制文件信息
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<MirrorConfig, MirrorError> {
    let mut file = File::open(path.as_ref())?;
    let mut s = String::new();

    let _ = file.read_to_string(&mut s);
    let mut config: MirrorConfig =
        toml::from_str(s.as_str()).map_err(|e| MirrorError::ConfigError(e.to_string()))?;
    apply_env_overrides(&mut config);

    Ok(config)
}

/// Environment wins over the file when the variable is set and non-empty.
pub fn apply_env_overrides(config: &mut MirrorConfig) {
    if let Some(host) = read_env("TARGET_HOST") {
        config.target.host = Some(host);
    }
    if let Some(port) = read_env("TARGET_PORT") {
        if let Ok(port) = port.parse::<i16>() {
            config.target.port = Some(port);
        }
    }
    if let Some(database) = read_env("TARGET_DATABASE") {
        config.target.database = database;
    }
    if let Some(username) = read_env("TARGET_USERNAME") {
        config.target.username = username;
    }
    if let Some(password) = read_env("TARGET_PASSWORD") {
        config.target.password = password;
    }
    if let Some(directory) = read_env("SQL_DIRECTORY") {
        config.journal.directory = directory;
    }
    if let Some(db_path) = read_env("CHECKPOINT_DB_PATH") {
        config.checkpoint.db_path = db_path;
    }
    if let Some(interval) = read_env("SQL_SCAN_INTERVAL_MS") {
        if let Ok(interval) = interval.parse::<u64>() {
            config.journal.scan_interval_ms = interval;
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => None,
    }
}

fn split_csv(list: &str) -> Vec<String> {
    list.split(',')
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .map(|x| x.to_string())
        .collect()
}

#[cfg(test)]
mod test {
    use crate::config::{split_csv, MigrationConfig, MirrorConfig};

    #[test]
    fn test_defaults() {
        let c = MirrorConfig::default();
        assert_eq!(c.migration.batch_size, 1000);
        assert!(!c.migration.drop_tables);
        assert!(c.migration.create_tables);
        assert!(c.migration.migrate_data);
        assert!(!c.migration.continue_on_error);
        assert!(c.migration.enable_resume);
        assert!(!c.migration.enable_incremental);
        assert_eq!(c.journal.scan_interval_ms, 5000);
    }

    #[test]
    fn test_split_csv() {
        assert_eq!(split_csv(""), Vec::<String>::new());
        assert_eq!(split_csv("users, orders ,"), vec!["users", "orders"]);
    }

    #[test]
    fn test_included_lists() {
        let mut m = MigrationConfig::default();
        assert!(m.included_database_list().is_empty());

        m.included_tables = "db1.users,orders".to_string();
        assert_eq!(m.included_table_list(), vec!["db1.users", "orders"]);
    }

    #[test]
    fn test_toml_round_trip() {
        let c = MirrorConfig::default();
        let s = toml::to_string(&c).unwrap();
        let back: MirrorConfig = toml::from_str(&s).unwrap();
        assert_eq!(back.migration.batch_size, c.migration.batch_size);
        assert_eq!(back.journal.directory, c.journal.directory);
    }
}
