use std::cmp::Ordering;
use std::str::FromStr;

use bigdecimal::BigDecimal;

use common::binlog::column_type::ColumnType;
use common::binlog::column_value::ColumnValue;
use common::sql::literal::quote_string;

/// Textual cursor form of a primary key cell, as stored in the progress
/// record.
pub fn pk_to_text(value: &ColumnValue) -> String {
    match value {
        ColumnValue::TinyInt(v) => v.to_string(),
        ColumnValue::SmallInt(v) => v.to_string(),
        ColumnValue::MediumInt(v) => v.to_string(),
        ColumnValue::Int(v) => v.to_string(),
        ColumnValue::BigInt(v) => v.to_string(),
        ColumnValue::Decimal(v) => v.clone(),
        ColumnValue::String(v) => v.clone(),
        ColumnValue::Year(v) => v.to_string(),
        other => format!("{:?}", other),
    }
}

/// Renders a stored cursor value as a seek-query literal.
pub fn render_pk(column_type: &ColumnType, value: &str) -> String {
    if is_numeric(column_type) {
        value.to_string()
    } else {
        quote_string(value)
    }
}

/// Ordering of two cursor values under the declared column type.
pub fn compare_pk(column_type: &ColumnType, a: &str, b: &str) -> Ordering {
    if is_numeric(column_type) {
        if let (Ok(a), Ok(b)) = (BigDecimal::from_str(a), BigDecimal::from_str(b)) {
            return a.cmp(&b);
        }
    }

    a.cmp(b)
}

fn is_numeric(column_type: &ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::Tiny
            | ColumnType::Short
            | ColumnType::Int24
            | ColumnType::Long
            | ColumnType::LongLong
            | ColumnType::Float
            | ColumnType::Double
            | ColumnType::Decimal
            | ColumnType::NewDecimal
            | ColumnType::Year
    )
}
