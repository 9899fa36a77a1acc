use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;

use common::err::MResult;

/// Written at the end of a binlog file, pointing at the next one. The server
/// also sends a fake rotate when a replica subscribes mid-stream.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct RotateEvent {
    /// First event position in the next file.
    pub position: u64,
    pub next_binlog: String,
}

impl RotateEvent {
    pub fn parse(cursor: &mut Cursor<&[u8]>) -> MResult<RotateEvent> {
        let position = cursor.read_u64::<LittleEndian>()?;

        let remaining = cursor.get_ref().len() as u64 - cursor.position();
        let mut name_raw = vec![0u8; remaining as usize];
        cursor.read_exact(&mut name_raw)?;
        let next_binlog = String::from_utf8_lossy(&name_raw).to_string();

        Ok(RotateEvent {
            position,
            next_binlog,
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::RotateEvent;

    #[test]
    fn test_parse() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&4u64.to_le_bytes());
        payload.extend_from_slice(b"bin.000002");

        let mut cursor = Cursor::new(payload.as_slice());
        let event = RotateEvent::parse(&mut cursor).unwrap();
        assert_eq!(event.position, 4);
        assert_eq!(event.next_binlog, "bin.000002");
    }
}
