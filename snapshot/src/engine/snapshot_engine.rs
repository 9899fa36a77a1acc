use std::time::Instant;

use tracing::{error, info, warn};

use common::binlog::column_type::ColumnType;
use common::config::MigrationConfig;
use common::err::mirror_error::MirrorError;
use common::err::MResult;
use common::pretty_util::to_duration_pretty;
use common::sql::literal::{quote_ident, render_value};
use connection::conn::connection::Connection;
use connection::conn::query_result::TypedRow;
use state::progress_store::{MigrationStatus, ProgressStore};

use crate::metadata::table_descriptor::TableDescriptor;
use crate::pk_value::{pk_to_text, render_pk};

#[derive(Debug, Default, Clone)]
pub struct SnapshotSummary {
    pub tables_total: usize,
    pub tables_completed: usize,
    pub tables_failed: usize,
    pub rows_copied: u64,
    pub rows_skipped: u64,
}

/// Schema apply plus batched, resumable row copy, sequential in discovery
/// order. Sole writer of the progress store.
pub struct SnapshotEngine {
    source: Connection,
    target: Connection,
    progress: ProgressStore,

    batch_size: usize,
    drop_tables: bool,
    create_tables: bool,
    migrate_data: bool,
    continue_on_error: bool,
    enable_resume: bool,
}

impl SnapshotEngine {
    pub fn new(
        source: Connection,
        target: Connection,
        progress: ProgressStore,
        migration: &MigrationConfig,
    ) -> Self {
        SnapshotEngine {
            source,
            target,
            progress,
            batch_size: migration.batch_size.max(1),
            drop_tables: migration.drop_tables,
            create_tables: migration.create_tables,
            migrate_data: migration.migrate_data,
            continue_on_error: migration.continue_on_error,
            enable_resume: migration.enable_resume,
        }
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn run(&mut self, tables: &[TableDescriptor]) -> MResult<SnapshotSummary> {
        self.source.try_connect()?;
        self.target.try_connect()?;

        // Temporal values cross the wire as text; pin both sessions to UTC.
        self.source.execute("SET time_zone = '+00:00'")?;
        self.target.execute("SET time_zone = '+00:00'")?;

        if self.create_tables {
            self.schema_phase(tables)?;
        }

        let mut summary = SnapshotSummary {
            tables_total: tables.len(),
            ..SnapshotSummary::default()
        };

        if self.migrate_data {
            for table in tables {
                match self.copy_table(table) {
                    Ok((copied, skipped)) => {
                        summary.tables_completed += 1;
                        summary.rows_copied += copied;
                        summary.rows_skipped += skipped;
                    }
                    Err(err @ MirrorError::DurabilityError(_)) => {
                        // A torn cursor would make any resume wrong.
                        return Err(err);
                    }
                    Err(err) => {
                        summary.tables_failed += 1;
                        error!("table {} copy failed: {}", table.name, err);
                    }
                }
            }
        }

        info!(
            "snapshot finished: {}/{} tables, {} rows copied, {} rows skipped",
            summary.tables_completed, summary.tables_total, summary.rows_copied, summary.rows_skipped
        );
        Ok(summary)
    }

    /// A previously migrated target may already hold compatible tables, so
    /// per-table failures do not halt the phase.
    fn schema_phase(&mut self, tables: &[TableDescriptor]) -> MResult<()> {
        let mut failures = 0usize;

        for table in tables {
            if self.drop_tables {
                let drop_sql = format!("DROP TABLE IF EXISTS {}", quote_ident(&table.name));
                if let Err(err) = self.target.execute(&drop_sql) {
                    warn!("drop of table {} failed: {}", table.name, err);
                }
            }

            match self.target.execute(&table.create_statement) {
                Ok(()) => info!("created table {}", table.name),
                Err(err) => {
                    failures += 1;
                    error!("create of table {} failed: {}", table.name, err);
                }
            }
        }

        if !tables.is_empty() && failures == tables.len() {
            return Err(MirrorError::ApplyError(
                "schema phase failed for every table".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns (rows copied, rows skipped by continue_on_error).
    fn copy_table(&mut self, table: &TableDescriptor) -> MResult<(u64, u64)> {
        // With resume on, a COMPLETED table stays untouched; a fresh copy of
        // it takes an operator reset or enable_resume = false.
        if self.enable_resume {
            if let Some(record) = self.progress.get(&table.name) {
                if record.status == MigrationStatus::COMPLETED {
                    info!("table {} already completed, skipping", table.name);
                    return Ok((0, 0));
                }
            }
        }

        let resume_pk = if self.enable_resume && table.primary_key.is_some() {
            self.progress.get(&table.name).and_then(|r| {
                if r.status != MigrationStatus::COMPLETED {
                    r.last_pk_value.clone()
                } else {
                    None
                }
            })
        } else {
            None
        };

        let record = self.progress.start(&table.name, table.total_rows)?;
        let mut migrated = if resume_pk.is_some() {
            record.migrated_rows
        } else {
            // Without a cursor the read restarts from the beginning.
            0
        };

        match &resume_pk {
            Some(pk) => info!(
                "copying table {} resuming after pk {} ({} rows already migrated)",
                table.name, pk, migrated
            ),
            None => info!(
                "copying table {} from scratch ({} rows at start)",
                table.name, table.total_rows
            ),
        }

        let select = build_select(table, resume_pk.as_deref());
        let pk_index = table.primary_key_index();
        let started = Instant::now();

        let batch_size = self.batch_size;
        let continue_on_error = self.continue_on_error;
        let SnapshotEngine {
            source,
            target,
            progress,
            ..
        } = self;

        let mut batch: Vec<TypedRow> = Vec::with_capacity(batch_size);
        let mut skipped = 0u64;

        let mut stream = source.query_stream(select)?;
        loop {
            let row = match stream.next() {
                None => break,
                Some(Ok(row)) => row,
                Some(Err(err)) => {
                    drop(stream);
                    progress.fail(&table.name, &err.to_string())?;
                    return Err(err);
                }
            };

            batch.push(row);
            if batch.len() >= batch_size {
                if let Err(err) = apply_batch(
                    target,
                    progress,
                    table,
                    &mut batch,
                    &mut migrated,
                    &mut skipped,
                    pk_index,
                    continue_on_error,
                ) {
                    drop(stream);
                    return Err(err);
                }
            }
        }
        drop(stream);

        apply_batch(
            target,
            progress,
            table,
            &mut batch,
            &mut migrated,
            &mut skipped,
            pk_index,
            continue_on_error,
        )?;

        progress.complete(&table.name)?;
        info!(
            "table {} completed: {} rows in {}",
            table.name,
            migrated,
            to_duration_pretty(&started.elapsed())
        );

        Ok((migrated, skipped))
    }
}

/// Applies and clears one buffered batch, advancing the durable cursor.
#[allow(clippy::too_many_arguments)]
fn apply_batch(
    target: &mut Connection,
    progress: &mut ProgressStore,
    table: &TableDescriptor,
    batch: &mut Vec<TypedRow>,
    migrated: &mut u64,
    skipped: &mut u64,
    pk_index: Option<usize>,
    continue_on_error: bool,
) -> MResult<()> {
    if batch.is_empty() {
        return Ok(());
    }

    // Rows arrive pk-ascending, so the batch maximum is its last row.
    let last_pk = pk_index.and_then(|i| {
        batch
            .last()
            .and_then(|row| row.get(i).cloned().flatten())
            .map(|v| pk_to_text(&v))
    });

    let sql = render_insert(table, batch);
    match target.execute(&sql) {
        Ok(()) => {
            *migrated += batch.len() as u64;
            progress.update(&table.name, *migrated, last_pk)?;
        }
        Err(err) => {
            if continue_on_error {
                *skipped += batch.len() as u64;
                warn!(
                    "batch of {} rows failed for table {} and was skipped: {}",
                    batch.len(),
                    table.name,
                    err
                );
                // Still advance the cursor so a restart does not re-read the
                // same rows.
                progress.update(&table.name, *migrated, last_pk)?;
            } else {
                progress.fail(&table.name, &err.to_string())?;
                return Err(err);
            }
        }
    }

    batch.clear();
    Ok(())
}

fn build_select(table: &TableDescriptor, resume_pk: Option<&str>) -> String {
    let columns = table
        .columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<String>>()
        .join(", ");
    let table_ident = quote_ident(&table.name);

    match (&table.primary_key, resume_pk) {
        (Some(pk), Some(from)) => {
            let pk_type = table.primary_key_type().unwrap_or(ColumnType::String);
            format!(
                "SELECT {} FROM {} WHERE {} > {} ORDER BY {}",
                columns,
                table_ident,
                quote_ident(pk),
                render_pk(&pk_type, from),
                quote_ident(pk)
            )
        }
        (Some(pk), None) => format!(
            "SELECT {} FROM {} ORDER BY {}",
            columns,
            table_ident,
            quote_ident(pk)
        ),
        (None, _) => format!("SELECT {} FROM {}", columns, table_ident),
    }
}

fn render_insert(table: &TableDescriptor, batch: &[TypedRow]) -> String {
    let columns = table
        .columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<String>>()
        .join(", ");

    let values = batch
        .iter()
        .map(|row| {
            let cells = row
                .iter()
                .map(|v| render_value(v.as_ref()))
                .collect::<Vec<String>>()
                .join(", ");
            format!("({})", cells)
        })
        .collect::<Vec<String>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(&table.name),
        columns,
        values
    )
}

#[cfg(test)]
mod test {
    use common::binlog::column_value::ColumnValue;

    use crate::metadata::table_descriptor::{ColumnDescriptor, TableDescriptor};

    use super::{build_select, render_insert};

    fn users(primary_key: Option<&str>) -> TableDescriptor {
        TableDescriptor {
            name: "users".to_string(),
            columns: vec![
                ColumnDescriptor {
                    name: "id".to_string(),
                    data_type: "int".to_string(),
                    nullable: false,
                    default_value: None,
                    auto_increment: true,
                    primary_key: primary_key.is_some(),
                },
                ColumnDescriptor {
                    name: "name".to_string(),
                    data_type: "varchar".to_string(),
                    nullable: true,
                    default_value: None,
                    auto_increment: false,
                    primary_key: false,
                },
            ],
            primary_key: primary_key.map(|s| s.to_string()),
            create_statement: String::new(),
            total_rows: 2,
        }
    }

    #[test]
    fn test_seek_query() {
        let sql = build_select(&users(Some("id")), Some("3"));
        assert_eq!(
            sql,
            "SELECT `id`, `name` FROM `users` WHERE `id` > 3 ORDER BY `id`"
        );
    }

    #[test]
    fn test_fresh_query_with_pk() {
        let sql = build_select(&users(Some("id")), None);
        assert_eq!(sql, "SELECT `id`, `name` FROM `users` ORDER BY `id`");
    }

    #[test]
    fn test_query_without_pk() {
        let sql = build_select(&users(None), None);
        assert_eq!(sql, "SELECT `id`, `name` FROM `users`");
    }

    #[test]
    fn test_render_insert() {
        let batch = vec![
            vec![
                Some(ColumnValue::Int(1)),
                Some(ColumnValue::String("a".to_string())),
            ],
            vec![Some(ColumnValue::Int(2)), None],
        ];

        let sql = render_insert(&users(Some("id")), &batch);
        assert_eq!(
            sql,
            "INSERT INTO `users` (`id`, `name`) VALUES (1, 'a'), (2, NULL)"
        );
    }
}
