use std::io::Cursor;

use serde::Serialize;

use common::err::MResult;

use crate::events::protocol::table_map_event::TableMapEvent;
use crate::row::row_data::{RowData, UpdateRowData};
use crate::row::row_parser::{parse_head, parse_row_data_list, parse_update_row_data_list};
use crate::utils::read_bitmap_little_endian;

/// WRITE_ROWS / DELETE_ROWS share one wire layout: post-header, present-column
/// bitmap, then packed rows.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct RowsEvent {
    pub table_id: u64,
    pub flags: u16,
    pub columns_number: usize,
    pub columns_present: Vec<bool>,
    pub rows: Vec<RowData>,
}

impl RowsEvent {
    /// `v2` carries an extra-data block between post-header and column count.
    pub fn parse(cursor: &mut Cursor<&[u8]>, table_map: &TableMapEvent, v2: bool) -> MResult<Self> {
        let (table_id, flags, columns_number) = parse_head(cursor, v2)?;
        let columns_present = read_bitmap_little_endian(cursor, columns_number)?;

        let rows = parse_row_data_list(cursor, table_map, &columns_present)?;

        Ok(RowsEvent {
            table_id,
            flags,
            columns_number,
            columns_present,
            rows,
        })
    }
}

/// UPDATE_ROWS carries a before and an after bitmap, and pairs of row images.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct UpdateRowsEvent {
    pub table_id: u64,
    pub flags: u16,
    pub columns_number: usize,
    pub before_image: Vec<bool>,
    pub after_image: Vec<bool>,
    pub rows: Vec<UpdateRowData>,
}

impl UpdateRowsEvent {
    pub fn parse(cursor: &mut Cursor<&[u8]>, table_map: &TableMapEvent, v2: bool) -> MResult<Self> {
        let (table_id, flags, columns_number) = parse_head(cursor, v2)?;
        let before_image = read_bitmap_little_endian(cursor, columns_number)?;
        let after_image = read_bitmap_little_endian(cursor, columns_number)?;

        let rows = parse_update_row_data_list(cursor, table_map, &before_image, &after_image)?;

        Ok(UpdateRowsEvent {
            table_id,
            flags,
            columns_number,
            before_image,
            after_image,
            rows,
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use common::binlog::column_value::ColumnValue;

    use crate::events::protocol::table_map_event::TableMapEvent;

    use super::{RowsEvent, UpdateRowsEvent};

    fn table_map() -> TableMapEvent {
        TableMapEvent {
            table_id: 42,
            flags: 0,
            database_name: "shop".to_string(),
            table_name: "users".to_string(),
            columns_number: 2,
            column_types: vec![3, 15],
            column_metadata: vec![0, 255],
            null_bitmap: vec![false, true],
        }
    }

    fn rows_head() -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&42u64.to_le_bytes()[0..6]);
        payload.extend_from_slice(&1u16.to_le_bytes());
        payload.extend_from_slice(&2u16.to_le_bytes()); // extra data, empty
        payload.push(2); // columns
        payload
    }

    #[test]
    fn test_write_rows() {
        let mut payload = rows_head();
        payload.push(0b0000_0011); // both columns present
        payload.push(0b0000_0000); // nothing null
        payload.extend_from_slice(&2u32.to_le_bytes());
        payload.push(1);
        payload.push(b'b');

        let table_map = table_map();
        let mut cursor = Cursor::new(payload.as_slice());
        let event = RowsEvent::parse(&mut cursor, &table_map, true).unwrap();

        assert_eq!(event.table_id, 42);
        assert_eq!(event.rows.len(), 1);
        assert_eq!(event.rows[0].cells[0], Some(ColumnValue::Int(2)));
    }

    #[test]
    fn test_update_rows() {
        let mut payload = rows_head();
        payload.push(0b0000_0011); // before image
        payload.push(0b0000_0011); // after image
        // before: (2, 'b')
        payload.push(0b0000_0000);
        payload.extend_from_slice(&2u32.to_le_bytes());
        payload.push(1);
        payload.push(b'b');
        // after: (2, 'c')
        payload.push(0b0000_0000);
        payload.extend_from_slice(&2u32.to_le_bytes());
        payload.push(1);
        payload.push(b'c');

        let table_map = table_map();
        let mut cursor = Cursor::new(payload.as_slice());
        let event = UpdateRowsEvent::parse(&mut cursor, &table_map, true).unwrap();

        assert_eq!(event.rows.len(), 1);
        assert_eq!(
            event.rows[0].before.cells[1],
            Some(ColumnValue::String("b".to_string()))
        );
        assert_eq!(
            event.rows[0].after.cells[1],
            Some(ColumnValue::String("c".to_string()))
        );
    }
}
