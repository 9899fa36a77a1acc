use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;

use common::binlog::column_type::ColumnType;
use common::err::mirror_error::MirrorError;
use common::err::MResult;

use crate::utils::{read_bitmap_little_endian, read_fixed_len_string, read_len_enc_num};

/// Table definition announced before each group of row events.
///
/// The binlog format carries no column names here; the decoder resolves
/// names out of band.
/// <a href="https://dev.mysql.com/doc/internals/en/table-map-event.html">See more</a>
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct TableMapEvent {
    /// table_id take 6 bytes in buffer
    pub table_id: u64,
    /// Reserved for future use; currently always 0.
    pub flags: u16,

    pub database_name: String,
    pub table_name: String,

    pub columns_number: u64,

    /// Column type codes, one per column.
    pub column_types: Vec<u8>,
    /// Per-column metadata, decoded according to the type.
    pub column_metadata: Vec<u16>,

    /// Column nullability.
    pub null_bitmap: Vec<bool>,
}

impl TableMapEvent {
    pub fn parse(cursor: &mut Cursor<&[u8]>) -> MResult<TableMapEvent> {
        // post-header
        let table_id = cursor.read_u48::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;

        // event-body: database and table are length-prefixed, null terminated
        let (_, database_name) = read_fixed_len_string(cursor)?;
        let term = cursor.read_u8()?;
        if term != 0 {
            return Err(MirrorError::DecodeError(
                "table map database name is not null terminated".to_string(),
            ));
        }

        let (_, table_name) = read_fixed_len_string(cursor)?;
        let term = cursor.read_u8()?;
        if term != 0 {
            return Err(MirrorError::DecodeError(
                "table map table name is not null terminated".to_string(),
            ));
        }

        let (_, columns_number) = read_len_enc_num(cursor)?;
        let mut column_types = vec![0u8; columns_number as usize];
        std::io::Read::read_exact(cursor, &mut column_types)?;

        let (_, _metadata_block_length) = read_len_enc_num(cursor)?;
        let column_metadata = TableMapEvent::parse_metadata(cursor, &column_types)?;

        let null_bitmap = read_bitmap_little_endian(cursor, columns_number as usize)?;

        // Extra metadata (MySQL 8 signedness, charsets, ...) is not consumed.
        Ok(TableMapEvent {
            table_id,
            flags,
            database_name,
            table_name,
            columns_number,
            column_types,
            column_metadata,
            null_bitmap,
        })
    }

    /// See https://mariadb.com/kb/en/library/rows_event_v1/#column-data-formats
    fn parse_metadata(cursor: &mut Cursor<&[u8]>, column_types: &[u8]) -> MResult<Vec<u16>> {
        let mut metadata = vec![0u16; column_types.len()];

        for (idx, &code) in column_types.iter().enumerate() {
            let column_type = ColumnType::try_from(code)
                .map_err(|_| MirrorError::DecodeError(format!("unknown column type {}", code)))?;

            metadata[idx] = match column_type {
                // 1 byte metadata
                ColumnType::Blob
                | ColumnType::Float
                | ColumnType::Double
                | ColumnType::Geometry
                | ColumnType::Json
                | ColumnType::Time2
                | ColumnType::DateTime2
                | ColumnType::Timestamp2 => cursor.read_u8()? as u16,

                // 2 bytes little endian
                ColumnType::Bit | ColumnType::VarChar => cursor.read_u16::<LittleEndian>()?,

                // precision then scale
                ColumnType::NewDecimal => {
                    let precision = cursor.read_u8()? as u16;
                    let scale = cursor.read_u8()? as u16;
                    (precision << 8) + scale
                }

                // real type then pack length, big endian
                ColumnType::Enum | ColumnType::Set | ColumnType::VarString | ColumnType::String => {
                    let t = cursor.read_u8()? as u16;
                    let len = cursor.read_u8()? as u16;
                    (t << 8) + len
                }

                // Tiny, Short, Int24, Long, LongLong, temporal v1 types...
                _ => 0,
            };
        }

        Ok(metadata)
    }
}
