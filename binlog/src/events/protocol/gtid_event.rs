use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;
use uuid::Uuid;

use common::binlog::position::Gtid;
use common::err::mirror_error::MirrorError;
use common::err::MResult;

/// Announces the GTID of the transaction that follows.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct GtidEvent {
    pub flags: u8,
    pub source_id: Uuid,
    pub transaction_id: u64,
}

impl GtidEvent {
    pub fn parse(cursor: &mut Cursor<&[u8]>) -> MResult<GtidEvent> {
        let flags = cursor.read_u8()?;

        let mut sid = [0u8; 16];
        cursor.read_exact(&mut sid)?;
        let source_id = Uuid::from_slice(&sid)
            .map_err(|e| MirrorError::DecodeError(format!("bad gtid sid: {}", e)))?;

        let transaction_id = cursor.read_u64::<LittleEndian>()?;

        Ok(GtidEvent {
            flags,
            source_id,
            transaction_id,
        })
    }

    pub fn to_gtid(&self) -> Gtid {
        Gtid::new(self.source_id, self.transaction_id, self.transaction_id)
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::GtidEvent;

    #[test]
    fn test_parse() {
        let mut payload = Vec::new();
        payload.push(1); // flags
        payload.extend_from_slice(&[
            0x72, 0x67, 0x57, 0xad, 0x44, 0x55, 0x11, 0xe8, 0xae, 0x04, 0x02, 0x42, 0xac, 0x11,
            0x00, 0x02,
        ]);
        payload.extend_from_slice(&9u64.to_le_bytes());

        let mut cursor = Cursor::new(payload.as_slice());
        let event = GtidEvent::parse(&mut cursor).unwrap();
        assert_eq!(event.transaction_id, 9);

        let gtid = event.to_gtid();
        assert_eq!(gtid.start, 9);
        assert_eq!(gtid.end, 9);
    }
}
