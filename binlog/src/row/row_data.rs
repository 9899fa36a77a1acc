use serde::Serialize;

use common::binlog::column_value::ColumnValue;

/// One decoded row: a cell per column, `None` for NULL or absent columns.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct RowData {
    pub cells: Vec<Option<ColumnValue>>,
}

impl RowData {
    pub fn new_with_cells(cells: Vec<Option<ColumnValue>>) -> Self {
        RowData { cells }
    }
}

/// Before/after images of an updated row.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct UpdateRowData {
    pub before: RowData,
    pub after: RowData,
}

impl UpdateRowData {
    pub fn new(before: RowData, after: RowData) -> Self {
        UpdateRowData { before, after }
    }
}
