use std::io::{Cursor, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use common::binlog::column_type::ColumnType;
use common::binlog::column_value::ColumnValue;
use common::err::mirror_error::MirrorError;
use common::err::MResult;

use crate::column::column_parser::{
    parse_bit, parse_blob, parse_date, parse_date_time, parse_date_time2, parse_string, parse_time,
    parse_time2, parse_timestamp, parse_timestamp2, parse_year,
};
use crate::column::decimal::parse_decimal;
use crate::events::protocol::table_map_event::TableMapEvent;
use crate::row::row_data::{RowData, UpdateRowData};
use crate::utils::{read_bitmap_little_endian, read_len_enc_num};

pub const TABLE_MAP_NOT_FOUND: &str =
    "No preceding TableMapEvent was found for the row event. \
You possibly started replication in the middle of a logical event group.";

/// Post-header of a rows event.
///
/// Returns (table_id, flags, columns_number).
pub fn parse_head(cursor: &mut Cursor<&[u8]>, has_extra_data: bool) -> MResult<(u64, u16, usize)> {
    let table_id = cursor.read_u48::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;

    if has_extra_data {
        let extra_data_length = cursor.read_u16::<LittleEndian>()?;
        if extra_data_length < 2 {
            return Err(MirrorError::DecodeError(
                "rows event extra data length < 2".to_string(),
            ));
        }
        // NDB info and partition ids are not needed downstream.
        cursor.seek(SeekFrom::Current(extra_data_length as i64 - 2))?;
    }

    let (_, columns_number) = read_len_enc_num(cursor)?;

    Ok((table_id, flags, columns_number as usize))
}

/// Parses rows of a write/delete event until the cursor is drained.
pub fn parse_row_data_list(
    cursor: &mut Cursor<&[u8]>,
    table_map: &TableMapEvent,
    columns_present: &[bool],
) -> MResult<Vec<RowData>> {
    let cells_included = get_bits_number(columns_present);
    let mut rows = Vec::new();

    while cursor.position() < cursor.get_ref().len() as u64 {
        rows.push(parse_row(cursor, table_map, columns_present, cells_included)?);
    }

    Ok(rows)
}

/// Parses before/after row pairs of an update event.
pub fn parse_update_row_data_list(
    cursor: &mut Cursor<&[u8]>,
    table_map: &TableMapEvent,
    before_image: &[bool],
    after_image: &[bool],
) -> MResult<Vec<UpdateRowData>> {
    let cells_included_before = get_bits_number(before_image);
    let cells_included_after = get_bits_number(after_image);
    let mut rows = Vec::new();

    while cursor.position() < cursor.get_ref().len() as u64 {
        let before = parse_row(cursor, table_map, before_image, cells_included_before)?;
        let after = parse_row(cursor, table_map, after_image, cells_included_after)?;

        rows.push(UpdateRowData::new(before, after));
    }

    Ok(rows)
}

/// See <a href="https://mariadb.com/kb/en/library/rows_event_v1/">MariaDB rows version 1</a>
/// See <a href="https://dev.mysql.com/doc/internals/en/rows-event.html">MySQL rows version 1/2</a>
fn parse_row(
    cursor: &mut Cursor<&[u8]>,
    table_map: &TableMapEvent,
    columns_present: &[bool],
    cells_included: usize,
) -> MResult<RowData> {
    let column_types = &table_map.column_types;
    let mut row = Vec::with_capacity(column_types.len());
    let null_bitmap = read_bitmap_little_endian(cursor, cells_included)?;

    let mut skipped_columns = 0;
    for i in 0..column_types.len() {
        // Data is missing if binlog_row_image != full
        if !columns_present[i] {
            skipped_columns += 1;
            row.push(None);
        }
        // Column is present and has null value
        else if null_bitmap[i - skipped_columns] {
            row.push(None);
        }
        // Column has data
        else {
            let mut column_type = column_types[i];
            let mut metadata = table_map.column_metadata[i];

            if matches!(ColumnType::try_from(column_type), Ok(ColumnType::String)) {
                get_actual_string_type(&mut column_type, &mut metadata);
            }

            row.push(Some(parse_cell(cursor, column_type, metadata)?));
        }
    }

    Ok(RowData::new_with_cells(row))
}

/// CHAR/ENUM/SET share type code 254 on the wire; the real type hides in the
/// metadata high byte.
fn get_actual_string_type(column_type: &mut u8, metadata: &mut u16) {
    if *metadata >= 256 {
        let byte0 = (*metadata >> 8) as u8;
        let byte1 = (*metadata & 0xff) as u16;

        if (byte0 & 0x30) != 0x30 {
            // Long CHAR: length spills into the type byte.
            *metadata = byte1 + ((((byte0 & 0x30) ^ 0x30) as u16) << 4);
            *column_type = byte0 | 0x30;
        } else {
            *column_type = byte0;
            *metadata = byte1;
        }
    }
}

/// Gets number of bits set in a bitmap.
fn get_bits_number(bitmap: &[bool]) -> usize {
    bitmap.iter().filter(|&&x| x).count()
}

fn parse_cell(cursor: &mut Cursor<&[u8]>, column_type: u8, metadata: u16) -> MResult<ColumnValue> {
    let column_type = ColumnType::try_from(column_type)
        .map_err(|_| MirrorError::DecodeError(format!("unknown column type {}", column_type)))?;

    let value = match column_type {
        /* Numeric types. The only place where numbers can be negative */
        ColumnType::Tiny => ColumnValue::TinyInt(cursor.read_u8()?),
        ColumnType::Short => ColumnValue::SmallInt(cursor.read_u16::<LittleEndian>()?),
        ColumnType::Int24 => ColumnValue::MediumInt(cursor.read_u24::<LittleEndian>()?),
        ColumnType::Long => ColumnValue::Int(cursor.read_u32::<LittleEndian>()?),
        ColumnType::LongLong => ColumnValue::BigInt(cursor.read_u64::<LittleEndian>()?),
        ColumnType::Float => ColumnValue::Float(cursor.read_f32::<LittleEndian>()?),
        ColumnType::Double => ColumnValue::Double(cursor.read_f64::<LittleEndian>()?),
        ColumnType::NewDecimal => ColumnValue::Decimal(parse_decimal(cursor, metadata)?),
        /* String types, includes varchar, varbinary & fixed char, binary */
        ColumnType::String | ColumnType::VarChar | ColumnType::VarString => {
            ColumnValue::String(parse_string(cursor, metadata)?)
        }
        /* BIT, ENUM, SET types */
        ColumnType::Bit => ColumnValue::Bit(parse_bit(cursor, metadata)?),
        ColumnType::Enum => {
            ColumnValue::Enum(cursor.read_uint::<LittleEndian>((metadata & 0xff) as usize)? as u32)
        }
        ColumnType::Set => {
            ColumnValue::Set(cursor.read_uint::<LittleEndian>((metadata & 0xff) as usize)?)
        }
        /* Blob types */
        ColumnType::TinyBlob
        | ColumnType::MediumBlob
        | ColumnType::LongBlob
        | ColumnType::Blob => ColumnValue::Blob(parse_blob(cursor, metadata)?),
        /* Date and time types */
        ColumnType::Year => ColumnValue::Year(parse_year(cursor, metadata)?),
        ColumnType::Date => ColumnValue::Date(parse_date(cursor, metadata)?),
        // Older versions of MySQL.
        ColumnType::Time => ColumnValue::Time(parse_time(cursor, metadata)?),
        ColumnType::Timestamp => ColumnValue::Timestamp(parse_timestamp(cursor, metadata)?),
        ColumnType::DateTime => ColumnValue::DateTime(parse_date_time(cursor, metadata)?),
        // MySQL 5.6.4+ types.
        ColumnType::Time2 => ColumnValue::Time(parse_time2(cursor, metadata)?),
        ColumnType::Timestamp2 => ColumnValue::Timestamp(parse_timestamp2(cursor, metadata)?),
        ColumnType::DateTime2 => ColumnValue::DateTime(parse_date_time2(cursor, metadata)?),
        /* MySQL-specific data types */
        ColumnType::Geometry | ColumnType::Json => ColumnValue::Blob(parse_blob(cursor, metadata)?),
        other => {
            return Err(MirrorError::DecodeError(format!(
                "parsing column type {:?} is not supported",
                other
            )))
        }
    };

    Ok(value)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use common::binlog::column_value::ColumnValue;

    use crate::events::protocol::table_map_event::TableMapEvent;

    use super::{parse_head, parse_row_data_list};

    fn table_map_two_columns() -> TableMapEvent {
        TableMapEvent {
            table_id: 42,
            flags: 0,
            database_name: "shop".to_string(),
            table_name: "users".to_string(),
            columns_number: 2,
            column_types: vec![3, 15], // Long, VarChar
            column_metadata: vec![0, 255],
            null_bitmap: vec![false, true],
        }
    }

    #[test]
    fn test_parse_head_v2() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&42u64.to_le_bytes()[0..6]);
        payload.extend_from_slice(&1u16.to_le_bytes()); // flags
        payload.extend_from_slice(&2u16.to_le_bytes()); // extra data length, no payload
        payload.push(2); // columns

        let mut cursor = Cursor::new(payload.as_slice());
        let (table_id, flags, columns) = parse_head(&mut cursor, true).unwrap();
        assert_eq!(table_id, 42);
        assert_eq!(flags, 1);
        assert_eq!(columns, 2);
    }

    #[test]
    fn test_parse_rows() {
        // Two rows of (id int, name varchar): (1, 'a'), (2, NULL)
        let mut payload = Vec::new();
        // row 1: null bitmap (nothing null)
        payload.push(0b0000_0000);
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.push(1);
        payload.push(b'a');
        // row 2: second column null
        payload.push(0b0000_0010);
        payload.extend_from_slice(&2u32.to_le_bytes());

        let table_map = table_map_two_columns();
        let mut cursor = Cursor::new(payload.as_slice());
        let rows = parse_row_data_list(&mut cursor, &table_map, &[true, true]).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells[0], Some(ColumnValue::Int(1)));
        assert_eq!(rows[0].cells[1], Some(ColumnValue::String("a".to_string())));
        assert_eq!(rows[1].cells[0], Some(ColumnValue::Int(2)));
        assert_eq!(rows[1].cells[1], None);
    }
}
