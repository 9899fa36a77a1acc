use serde::Serialize;

use common::binlog::column_type::ColumnType;

/// One source column as discovery saw it.
#[derive(Debug, Serialize, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    /// information_schema data_type, lower case ("int", "varchar", ...).
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub auto_increment: bool,
    pub primary_key: bool,
}

/// Immutable description of one source table for the duration of a snapshot.
#[derive(Debug, Serialize, Clone)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,

    /// Single-column primary key. Composite keys degrade to `None`: no
    /// resumable cursor.
    pub primary_key: Option<String>,

    /// Normalized CREATE statement, database neutral.
    pub create_statement: String,

    /// `SELECT COUNT(*)` at discovery time; the table keeps moving after.
    pub total_rows: u64,
}

impl TableDescriptor {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Index of the primary key in the column list.
    pub fn primary_key_index(&self) -> Option<usize> {
        let pk = self.primary_key.as_ref()?;
        self.columns.iter().position(|c| &c.name == pk)
    }

    /// Wire type the primary key values order under.
    pub fn primary_key_type(&self) -> Option<ColumnType> {
        let pk = self.primary_key.as_ref()?;
        let column = self.columns.iter().find(|c| &c.name == pk)?;
        Some(data_type_to_column_type(&column.data_type))
    }
}

/// Maps information_schema data_type names onto wire column types, for PK
/// ordering decisions.
pub fn data_type_to_column_type(data_type: &str) -> ColumnType {
    match data_type.to_lowercase().as_str() {
        "tinyint" => ColumnType::Tiny,
        "smallint" => ColumnType::Short,
        "mediumint" => ColumnType::Int24,
        "int" | "integer" => ColumnType::Long,
        "bigint" => ColumnType::LongLong,
        "float" => ColumnType::Float,
        "double" | "real" => ColumnType::Double,
        "decimal" | "numeric" => ColumnType::NewDecimal,
        "date" => ColumnType::Date,
        "time" => ColumnType::Time2,
        "datetime" => ColumnType::DateTime2,
        "timestamp" => ColumnType::Timestamp2,
        "year" => ColumnType::Year,
        "char" => ColumnType::String,
        "varchar" => ColumnType::VarChar,
        "tinyblob" | "tinytext" => ColumnType::TinyBlob,
        "mediumblob" | "mediumtext" => ColumnType::MediumBlob,
        "longblob" | "longtext" => ColumnType::LongBlob,
        "blob" | "text" => ColumnType::Blob,
        "enum" => ColumnType::Enum,
        "set" => ColumnType::Set,
        "bit" => ColumnType::Bit,
        "json" => ColumnType::Json,
        "geometry" => ColumnType::Geometry,
        _ => ColumnType::String,
    }
}
