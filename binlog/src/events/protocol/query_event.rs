use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;

use common::err::MResult;

use crate::utils::read_string;

/// 记录修改类语句的事件。
///
/// Logged for every statement that is not row-logged: DDL, and the
/// transaction-control statements surrounding row events.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct QueryEvent {
    /// Client thread that issued the statement.
    pub thread_id: u32,
    /// Seconds from statement start to logging.
    pub exec_time: u32,
    pub error_code: u16,

    /// Database that was default when the statement ran.
    pub schema: String,
    pub query: String,
}

impl QueryEvent {
    pub fn parse(cursor: &mut Cursor<&[u8]>) -> MResult<QueryEvent> {
        let thread_id = cursor.read_u32::<LittleEndian>()?;
        let exec_time = cursor.read_u32::<LittleEndian>()?;
        let schema_length = cursor.read_u8()?;
        let error_code = cursor.read_u16::<LittleEndian>()?;
        let status_vars_length = cursor.read_u16::<LittleEndian>()?;

        // Status vars are not needed downstream.
        cursor.seek(SeekFrom::Current(status_vars_length as i64))?;

        let schema = read_string(cursor, schema_length as usize)?;
        let _term = cursor.read_u8()?;

        let remaining = cursor.get_ref().len() as u64 - cursor.position();
        let mut query_raw = vec![0u8; remaining as usize];
        cursor.read_exact(&mut query_raw)?;
        let query = String::from_utf8_lossy(&query_raw).to_string();

        Ok(QueryEvent {
            thread_id,
            exec_time,
            error_code,
            schema,
            query,
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::QueryEvent;

    #[test]
    fn test_parse() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&7u32.to_le_bytes()); // thread id
        payload.extend_from_slice(&0u32.to_le_bytes()); // exec time
        payload.push(4); // schema length
        payload.extend_from_slice(&0u16.to_le_bytes()); // error code
        payload.extend_from_slice(&2u16.to_le_bytes()); // status vars length
        payload.extend_from_slice(&[0x00, 0x00]); // status vars
        payload.extend_from_slice(b"shop");
        payload.push(0);
        payload.extend_from_slice(b"ALTER TABLE users ADD COLUMN age INT");

        let mut cursor = Cursor::new(payload.as_slice());
        let event = QueryEvent::parse(&mut cursor).unwrap();
        assert_eq!(event.thread_id, 7);
        assert_eq!(event.schema, "shop");
        assert_eq!(event.query, "ALTER TABLE users ADD COLUMN age INT");
    }
}
