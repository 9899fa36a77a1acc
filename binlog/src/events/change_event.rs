use serde::Serialize;

use common::binlog::column_value::ColumnValue;

/// One row image: ordered (column name, value) pairs. `None` is SQL NULL.
pub type RowImage = Vec<(String, Option<ColumnValue>)>;

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct UpdateRow {
    pub before: RowImage,
    pub after: RowImage,
}

/// A decoded, name-enriched change ready for a sink.
///
/// Table map events are consumed by the decoder and never surface here.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub enum ChangeEvent {
    Ddl {
        database: String,
        sql: String,
    },
    Insert {
        database: String,
        table: String,
        rows: Vec<RowImage>,
    },
    Update {
        database: String,
        table: String,
        rows: Vec<UpdateRow>,
    },
    Delete {
        database: String,
        table: String,
        rows: Vec<RowImage>,
    },
}

impl ChangeEvent {
    pub fn database(&self) -> &str {
        match self {
            ChangeEvent::Ddl { database, .. }
            | ChangeEvent::Insert { database, .. }
            | ChangeEvent::Update { database, .. }
            | ChangeEvent::Delete { database, .. } => database,
        }
    }

    /// DDL carries only a database.
    pub fn table(&self) -> Option<&str> {
        match self {
            ChangeEvent::Ddl { .. } => None,
            ChangeEvent::Insert { table, .. }
            | ChangeEvent::Update { table, .. }
            | ChangeEvent::Delete { table, .. } => Some(table),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ChangeEvent::Ddl { .. } => "DDL",
            ChangeEvent::Insert { .. } => "INSERT",
            ChangeEvent::Update { .. } => "UPDATE",
            ChangeEvent::Delete { .. } => "DELETE",
        }
    }
}
