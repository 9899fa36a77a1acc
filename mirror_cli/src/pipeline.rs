use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{info, warn};

use binlog::filter::ReplicationFilter;
use binlog::sink::EventSink;
use common::binlog::position::BinlogPosition;
use common::config::MirrorConfig;
use common::err::mirror_error::MirrorError;
use common::err::MResult;
use connection::binlog::binlog_options::BinlogOptions;
use connection::binlog::binlog_tailer::{BinlogTailer, TailerHandle};
use connection::binlog::column_name_resolver::InformationSchemaResolver;
use connection::binlog::direct_apply_sink::DirectApplySink;
use connection::binlog::lifecycle::NoopLifecycle;
use connection::conn::configure;
use connection::conn::connection::Connection;
use connection::conn::connection_options::ConnectionOptions;
use journal::replayer::{JournalReplayer, ReplayerHandle};
use journal::writer::JournalWriter;
use snapshot::engine::snapshot_engine::{SnapshotEngine, SnapshotSummary};
use snapshot::metadata::metadata_reader::MetadataReader;
use snapshot::metadata::table_descriptor::TableDescriptor;
use state::checkpoint_store::CheckpointStore;
use state::progress_store::ProgressStore;

/// Wires configuration into the full control flow: discovery, snapshot-start
/// checkpoint, schema and data phases, then tail plus replay.
pub struct Pipeline {
    config: MirrorConfig,
}

impl Pipeline {
    pub fn new(config: MirrorConfig) -> Self {
        Pipeline { config }
    }

    pub fn filter(&self) -> ReplicationFilter {
        ReplicationFilter::new(
            self.config.migration.included_database_list(),
            self.config.migration.included_table_list(),
        )
    }

    /// Source tables that pass the allow-list, in discovery order.
    pub fn discover_tables(&self) -> MResult<Vec<TableDescriptor>> {
        let database = self.config.source.database.clone();
        let mut reader = MetadataReader::new(Connection::new(self.source_options()), database.clone());
        let filter = self.filter();

        let mut tables = Vec::new();
        for name in reader.table_names()? {
            if !filter.should_process(&database, &name) {
                info!("table {} excluded by allow-list", name);
                continue;
            }
            tables.push(reader.table_descriptor(&name)?);
        }

        info!("discovered {} tables in {}", tables.len(), database);
        Ok(tables)
    }

    /// The snapshot start position must exist before the first snapshot read;
    /// a restart keeps the already recorded checkpoint.
    pub fn ensure_checkpoint(&self) -> MResult<BinlogPosition> {
        let store = self.checkpoint_store();

        if let Some(existing) = store.load()? {
            info!("checkpoint already recorded at {}", existing);
            return Ok(existing);
        }

        let mut conn = Connection::new(self.source_options());
        conn.try_connect()?;
        let position = configure::read_master_position(&mut conn)?;
        store.save(&position)?;
        info!("snapshot start position recorded at {}", position);

        Ok(position)
    }

    pub fn run_snapshot(&self, tables: &[TableDescriptor]) -> MResult<SnapshotSummary> {
        let progress = ProgressStore::open(self.progress_path())?;
        let mut engine = SnapshotEngine::new(
            Connection::new(self.source_options()),
            Connection::new(self.target_options()),
            progress,
            &self.config.migration,
        );

        engine.run(tables)
    }

    /// Tail thread: source binlog → configured sink, from the checkpoint.
    pub fn spawn_tailer(
        &self,
        start: BinlogPosition,
    ) -> MResult<(TailerHandle, JoinHandle<()>)> {
        let mut tailer = BinlogTailer::new(
            self.source_options(),
            BinlogOptions::from_position(start.get_file_name().to_string(), start.get_position()),
            self.filter(),
        );
        let handle = tailer.handle();

        let mut sink: Box<dyn EventSink> = if self.config.migration.is_direct_sink() {
            Box::new(DirectApplySink::new(self.target_options()))
        } else {
            Box::new(JournalWriter::new(&self.config.journal.directory)?)
        };
        let mut resolver = InformationSchemaResolver::new(self.source_options());

        let join = std::thread::Builder::new()
            .name("binlog-tail".to_string())
            .spawn(move || {
                let mut lifecycle = NoopLifecycle;
                if let Err(err) = tailer.start(sink.as_mut(), &mut resolver, &mut lifecycle) {
                    warn!("binlog tail exited with error: {}", err);
                }
            })
            .map_err(|e| MirrorError::String(format!("spawn tail thread: {}", e)))?;

        Ok((handle, join))
    }

    /// Replay thread: journal directory → target, checkpoint gated.
    pub fn spawn_replayer(&self) -> MResult<(ReplayerHandle, JoinHandle<()>)> {
        let mut replayer = JournalReplayer::new(
            self.config.journal.directory.clone(),
            Connection::new(self.target_options()),
            self.checkpoint_store(),
            Duration::from_millis(self.config.journal.scan_interval_ms),
        )?;
        let handle = replayer.handle();

        let join = std::thread::Builder::new()
            .name("journal-replay".to_string())
            .spawn(move || {
                if let Err(err) = replayer.run() {
                    warn!("replayer exited with error: {}", err);
                }
            })
            .map_err(|e| MirrorError::String(format!("spawn replay thread: {}", e)))?;

        Ok((handle, join))
    }

    pub fn progress_store(&self) -> MResult<ProgressStore> {
        ProgressStore::open(self.progress_path())
    }

    pub fn checkpoint_store(&self) -> CheckpointStore {
        CheckpointStore::new(&self.config.checkpoint.db_path)
    }

    fn progress_path(&self) -> String {
        // Kept next to the checkpoint record.
        format!("{}.progress.json", self.config.checkpoint.db_path)
    }

    fn source_options(&self) -> ConnectionOptions {
        ConnectionOptions::new_str(
            self.config.source.get_host(),
            self.config.source.get_port(),
            &self.config.source.username,
            &self.config.source.password,
        )
        .with_database(self.config.source.database.clone())
    }

    fn target_options(&self) -> ConnectionOptions {
        ConnectionOptions::new_str(
            self.config.target.get_host(),
            self.config.target.get_port(),
            &self.config.target.username,
            &self.config.target.password,
        )
        .with_database(self.config.target.database.clone())
    }
}

#[cfg(test)]
mod test {
    use common::config::MirrorConfig;

    use super::Pipeline;

    #[test]
    fn test_filter_from_config() {
        let mut config = MirrorConfig::default();
        config.migration.included_tables = "users".to_string();

        let pipeline = Pipeline::new(config);
        let filter = pipeline.filter();
        assert!(filter.should_process("shop", "users"));
        assert!(!filter.should_process("shop", "orders"));
    }

    #[test]
    fn test_progress_path_derived() {
        let mut config = MirrorConfig::default();
        config.checkpoint.db_path = "/tmp/mirror/cp.json".to_string();

        let pipeline = Pipeline::new(config);
        assert_eq!(pipeline.progress_path(), "/tmp/mirror/cp.json.progress.json");
    }
}
