use binlog::decoder::event_decoder::ColumnNameResolver;
use common::err::MResult;
use common::sql::literal::quote_string;

use crate::conn::connection::Connection;
use crate::conn::connection_options::ConnectionOptions;

/// Resolves row-event column names from the source's information schema.
///
/// Runs on a dedicated connection: the dump channel cannot serve queries
/// while streaming.
#[derive(Debug)]
pub struct InformationSchemaResolver {
    conn: Connection,
}

impl InformationSchemaResolver {
    pub fn new(options: ConnectionOptions) -> Self {
        InformationSchemaResolver {
            conn: Connection::new(options),
        }
    }
}

impl ColumnNameResolver for InformationSchemaResolver {
    fn column_names(&mut self, database: &str, table: &str) -> MResult<Vec<String>> {
        self.conn.try_connect()?;

        let sql = format!(
            "SELECT column_name FROM information_schema.columns \
WHERE table_schema = {} AND table_name = {} ORDER BY ordinal_position",
            quote_string(database),
            quote_string(table)
        );

        let rows = self.conn.query(sql)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect())
    }
}
