use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use common::binlog::column_type::ColumnType;
use common::binlog::column_value::{self, ColumnValue};
use common::err::mirror_error::MirrorError;
use common::err::MResult;

use crate::conn::connection::Connection;
use crate::declar::capability_flags;
use crate::packet::end_of_file_packet::EndOfFilePacket;
use crate::packet::result_set_column_packet::ResultSetColumnPacket;
use crate::packet::result_set_row_packet::ResultSetRowPacket;

const TIMESTAMP_WITH_MILLS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const TIME_WITH_MILLS_FORMAT: &str = "%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// One column of a result set, as the snapshot engine needs it.
#[derive(Debug, Clone)]
pub struct SourceColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub unsigned: bool,
}

/// Typed row of a streaming result set.
pub type TypedRow = Vec<Option<ColumnValue>>;

const UNSIGNED_FLAG: u16 = 0x0020;

/// Streams rows of one result set off the wire, converting text cells to
/// typed values by the declared column type.
#[derive(Debug)]
pub struct StreamQueryResult<'a> {
    conn: &'a mut Connection,
    columns: Arc<[SourceColumn]>,
    has_results: bool,
}

impl StreamQueryResult<'_> {
    pub(crate) fn new(conn: &mut Connection, columns: Arc<[SourceColumn]>) -> StreamQueryResult {
        let has_results = !columns.is_empty();
        StreamQueryResult {
            conn,
            columns,
            has_results,
        }
    }

    pub fn columns(&self) -> &Arc<[SourceColumn]> {
        &self.columns
    }
}

impl Iterator for StreamQueryResult<'_> {
    type Item = MResult<TypedRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_results {
            return None;
        }

        let (packet, _) = match self.conn.read_packet_with_check("Query result row load error.") {
            Ok(packet) => packet,
            Err(err) => {
                self.has_results = false;
                return Some(Err(MirrorError::QueryError(format!(
                    "Query error. msg:{:?}",
                    err
                ))));
            }
        };

        if EndOfFilePacket::is_eof(packet.as_slice()) {
            self.has_results = false;
            return None;
        }

        let row = match ResultSetRowPacket::parse(&packet) {
            Ok(row) => row,
            Err(err) => {
                return Some(Err(MirrorError::QueryError(format!(
                    "Query result row parse error. msg:{:?}",
                    err
                ))))
            }
        };

        Some(parse_row(row, &self.columns))
    }
}

/// The remaining rows must be drained before the connection is reusable.
impl Drop for StreamQueryResult<'_> {
    fn drop(&mut self) {
        while self.next().is_some() {}
    }
}

pub fn read_column_set(conn: &mut Connection) -> MResult<Vec<SourceColumn>> {
    let (packet, _) = conn.read_packet_with_check("Query result column load error.")?;

    let mut cursor = std::io::Cursor::new(packet.as_slice());
    let column_count = binlog::utils::read_len_enc_num(&mut cursor)?.1;
    let mut columns: Vec<SourceColumn> = Vec::with_capacity(column_count as usize);
    for _ in 0..column_count {
        let (packet, _) = conn.read_packet_with_check("Query result column load error.")?;
        let column = ResultSetColumnPacket::parse(packet.as_slice())?;

        columns.push(parse_column(column)?);
    }

    if !conn.has_capability(capability_flags::CLIENT_DEPRECATE_EOF) {
        // 丢弃 eof packet
        let (_, _) = conn.read_packet_with_check("Query result eof load error.")?;
    }

    Ok(columns)
}

fn parse_column(column: ResultSetColumnPacket) -> MResult<SourceColumn> {
    let column_type = ColumnType::try_from(column.column_type).map_err(|err| {
        MirrorError::QueryError(format!("Can not parse column type. msg:{:?}", err))
    })?;

    Ok(SourceColumn {
        name: column.name,
        column_type,
        unsigned: column.flags & UNSIGNED_FLAG != 0,
    })
}

fn parse_row(row: ResultSetRowPacket, columns: &Arc<[SourceColumn]>) -> MResult<TypedRow> {
    let mut values = Vec::with_capacity(columns.len());

    for (index, column) in columns.iter().enumerate() {
        let value = row.cells.get(index).unwrap_or(&None);
        values.push(parse_text_value_by_type(value, &column.column_type)?);
    }

    Ok(values)
}

/// 将query结果的value值按照column类型转换为ColumnValue
fn parse_text_value_by_type(
    ori_value: &Option<String>,
    column_type: &ColumnType,
) -> MResult<Option<ColumnValue>> {
    let ori_value = match ori_value {
        None => return Ok(None),
        Some(v) => v.clone(),
    };

    let value = match column_type {
        ColumnType::Tiny => ColumnValue::TinyInt(parse_string_to_num::<u8>(&ori_value)?),
        ColumnType::Short => ColumnValue::SmallInt(parse_string_to_num::<u16>(&ori_value)?),
        ColumnType::Int24 => ColumnValue::MediumInt(parse_string_to_num::<u32>(&ori_value)?),
        ColumnType::Long => ColumnValue::Int(parse_string_to_num::<u32>(&ori_value)?),
        ColumnType::LongLong => ColumnValue::BigInt(parse_string_to_num::<u64>(&ori_value)?),
        ColumnType::Float => ColumnValue::Float(parse_string_to_num::<f32>(&ori_value)?),
        ColumnType::Double => ColumnValue::Double(parse_string_to_num::<f64>(&ori_value)?),
        ColumnType::Decimal | ColumnType::NewDecimal => ColumnValue::Decimal(ori_value),
        ColumnType::VarString | ColumnType::VarChar | ColumnType::String => {
            ColumnValue::String(ori_value)
        }
        ColumnType::TinyBlob
        | ColumnType::MediumBlob
        | ColumnType::LongBlob
        | ColumnType::Blob
        | ColumnType::Geometry
        | ColumnType::Json => ColumnValue::Blob(ori_value.into_bytes()),
        ColumnType::Year => ColumnValue::Year(parse_string_to_num::<u16>(&ori_value)?),
        ColumnType::Date | ColumnType::NewDate => {
            let date = parse_date(&ori_value)?;
            ColumnValue::Date(column_value::Date {
                year: date.year() as u16,
                month: date.month() as u8,
                day: date.day() as u8,
            })
        }
        ColumnType::Time | ColumnType::Time2 => {
            let time = parse_time(&ori_value)?;
            ColumnValue::Time(column_value::Time {
                hour: time.hour() as i16,
                minute: time.minute() as u8,
                second: time.second() as u8,
                millis: time.nanosecond() / 1_000_000,
            })
        }
        ColumnType::Timestamp | ColumnType::Timestamp2 => {
            // Session time_zone is forced to UTC before snapshot reads.
            let date_time = parse_timestamp(&ori_value)?;
            ColumnValue::Timestamp(date_time.and_utc().timestamp_millis() as u64)
        }
        ColumnType::DateTime | ColumnType::DateTime2 => {
            let date_time = parse_timestamp(&ori_value)?;
            ColumnValue::DateTime(column_value::DateTime {
                year: date_time.year() as u16,
                month: date_time.month() as u8,
                day: date_time.day() as u8,
                hour: date_time.hour() as u8,
                minute: date_time.minute() as u8,
                second: date_time.second() as u8,
                millis: date_time.and_utc().timestamp_subsec_millis(),
            })
        }
        ColumnType::Null => return Ok(None),
        // 其余的类型保留二进制原始数据
        _ => ColumnValue::Blob(ori_value.into_bytes()),
    };

    Ok(Some(value))
}

fn parse_string_to_num<T: FromStr>(value: &str) -> MResult<T> {
    value.parse::<T>().map_err(|_| {
        MirrorError::QueryError(format!("Can not parse value:{{{value}}} to number"))
    })
}

fn parse_timestamp(value: &str) -> MResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_WITH_MILLS_FORMAT).map_err(|_| {
        MirrorError::QueryError(format!(
            "Can not parse timestamp, value:{{{value}}}, format:{{{TIMESTAMP_WITH_MILLS_FORMAT}}}"
        ))
    })
}

fn parse_date(value: &str) -> MResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        MirrorError::QueryError(format!(
            "Can not parse date, value:{{{value}}}, format:{{{DATE_FORMAT}}}"
        ))
    })
}

fn parse_time(value: &str) -> MResult<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_WITH_MILLS_FORMAT).map_err(|_| {
        MirrorError::QueryError(format!(
            "Can not parse time, value:{{{value}}}, format:{{{TIME_WITH_MILLS_FORMAT}}}"
        ))
    })
}

#[cfg(test)]
mod test {
    use common::binlog::column_type::ColumnType;
    use common::binlog::column_value::ColumnValue;

    use super::parse_text_value_by_type;

    #[test]
    fn test_numeric() {
        let v = parse_text_value_by_type(&Some("42".to_string()), &ColumnType::Long).unwrap();
        assert_eq!(v, Some(ColumnValue::Int(42)));
    }

    #[test]
    fn test_null() {
        let v = parse_text_value_by_type(&None, &ColumnType::Long).unwrap();
        assert_eq!(v, None);
    }

    #[test]
    fn test_date() {
        let v = parse_text_value_by_type(&Some("2024-03-09".to_string()), &ColumnType::Date)
            .unwrap()
            .unwrap();
        match v {
            ColumnValue::Date(d) => assert_eq!((d.year, d.month, d.day), (2024, 3, 9)),
            other => panic!("expected date, got {:?}", other),
        }
    }

    #[test]
    fn test_datetime() {
        let v = parse_text_value_by_type(
            &Some("2024-03-09 13:21:05".to_string()),
            &ColumnType::DateTime,
        )
        .unwrap()
        .unwrap();
        match v {
            ColumnValue::DateTime(d) => {
                assert_eq!((d.hour, d.minute, d.second), (13, 21, 5));
            }
            other => panic!("expected datetime, got {:?}", other),
        }
    }
}
