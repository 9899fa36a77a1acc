use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use common::err::mirror_error::MirrorError;
use common::err::MResult;
use common::sql::literal::{quote_ident, quote_string};
use connection::conn::connection::Connection;

use crate::metadata::table_descriptor::{ColumnDescriptor, TableDescriptor};

/// `db`.`table` qualifier after CREATE TABLE. Matching inside backticks keeps
/// dotted identifiers intact.
static CREATE_QUALIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\s*CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?)`[^`]+`\.(`[^`]+`)").unwrap()
});

static AUTO_INCREMENT_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bAUTO_INCREMENT=\d+").unwrap());

/// Source-side discovery: table list, per-table shape, CREATE DDL, row count.
pub struct MetadataReader {
    conn: Connection,
    database: String,
}

impl MetadataReader {
    pub fn new(conn: Connection, database: String) -> Self {
        MetadataReader { conn, database }
    }

    pub fn table_names(&mut self) -> MResult<Vec<String>> {
        self.conn.try_connect()?;

        let sql = format!(
            "SELECT table_name FROM information_schema.tables \
WHERE table_schema = {} AND table_type = 'BASE TABLE' ORDER BY table_name",
            quote_string(&self.database)
        );

        let rows = self.conn.query(sql)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect())
    }

    pub fn table_descriptor(&mut self, table: &str) -> MResult<TableDescriptor> {
        self.conn.try_connect()?;

        let columns = self.read_columns(table)?;
        if columns.is_empty() {
            return Err(MirrorError::MetadataError(format!(
                "table {} has no columns in information_schema",
                table
            )));
        }

        let pk_columns: Vec<&ColumnDescriptor> =
            columns.iter().filter(|c| c.primary_key).collect();
        let primary_key = match pk_columns.len() {
            1 => Some(pk_columns[0].name.clone()),
            0 => {
                warn!("table {} has no primary key; resume disabled", table);
                None
            }
            n => {
                warn!(
                    "table {} has a composite primary key ({} columns); resume disabled",
                    table, n
                );
                None
            }
        };

        let create_statement = normalize_create(&self.read_create_statement(table)?);
        let total_rows = self.count_rows(table)?;

        debug!(
            "described table {}: {} columns, {} rows, pk {:?}",
            table,
            columns.len(),
            total_rows,
            primary_key
        );

        Ok(TableDescriptor {
            name: table.to_string(),
            columns,
            primary_key,
            create_statement,
            total_rows,
        })
    }

    fn read_columns(&mut self, table: &str) -> MResult<Vec<ColumnDescriptor>> {
        let sql = format!(
            "SELECT column_name, data_type, is_nullable, column_default, extra, column_key \
FROM information_schema.columns WHERE table_schema = {} AND table_name = {} \
ORDER BY ordinal_position",
            quote_string(&self.database),
            quote_string(table)
        );

        let rows = self.conn.query(sql)?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name = cell(&row, 0).ok_or_else(|| {
                MirrorError::MetadataError(format!("column row without a name in table {}", table))
            })?;
            let data_type = cell(&row, 1).unwrap_or_default();
            let nullable = cell(&row, 2).map(|v| v.eq_ignore_ascii_case("YES")).unwrap_or(false);
            let default_value = cell(&row, 3);
            let extra = cell(&row, 4).unwrap_or_default();
            let column_key = cell(&row, 5).unwrap_or_default();

            columns.push(ColumnDescriptor {
                name,
                data_type,
                nullable,
                default_value,
                auto_increment: extra.to_lowercase().contains("auto_increment"),
                primary_key: column_key.eq_ignore_ascii_case("PRI"),
            });
        }

        Ok(columns)
    }

    fn read_create_statement(&mut self, table: &str) -> MResult<String> {
        let sql = format!(
            "SHOW CREATE TABLE {}.{}",
            quote_ident(&self.database),
            quote_ident(table)
        );

        let rows = self.conn.query(sql)?;
        rows.into_iter()
            .next()
            .and_then(|row| row.into_iter().nth(1).flatten())
            .ok_or_else(|| {
                MirrorError::MetadataError(format!("SHOW CREATE TABLE returned nothing for {}", table))
            })
    }

    fn count_rows(&mut self, table: &str) -> MResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}.{}",
            quote_ident(&self.database),
            quote_ident(table)
        );

        let count = self
            .conn
            .query_scalar(sql)?
            .ok_or_else(|| MirrorError::MetadataError(format!("COUNT(*) returned nothing for {}", table)))?;
        Ok(count.parse::<u64>()?)
    }
}

/// Makes a CREATE statement database neutral and resets the auto increment
/// counter, so it can be replayed on any target database.
pub fn normalize_create(create: &str) -> String {
    let stripped = CREATE_QUALIFIER.replace(create, "$1$2");
    AUTO_INCREMENT_OPTION
        .replace_all(&stripped, "AUTO_INCREMENT=1")
        .to_string()
}

fn cell(row: &[Option<String>], index: usize) -> Option<String> {
    row.get(index).cloned().flatten()
}
