use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use common::err::MResult;

use crate::packet::response_type::ResponseType;

#[derive(Debug)]
pub struct EndOfFilePacket {
    pub warning_count: u16,
    pub server_status: u16,
}

impl EndOfFilePacket {
    pub fn parse(packet: &[u8]) -> MResult<Self> {
        let mut cursor = Cursor::new(packet);

        let warning_count = cursor.read_u16::<LittleEndian>()?;
        let server_status = cursor.read_u16::<LittleEndian>()?;

        Ok(Self {
            warning_count,
            server_status,
        })
    }

    pub fn is_eof(packet: &[u8]) -> bool {
        // [fe] also leads a LengthEncodedInteger; a real EOF packet is < 9 bytes.
        if packet.is_empty() || packet.len() >= 9 {
            return false;
        }
        packet[0] == ResponseType::END_OF_FILE
    }
}

#[cfg(test)]
mod test {
    use super::EndOfFilePacket;

    #[test]
    fn test_is_eof() {
        assert!(EndOfFilePacket::is_eof(&[0xfe, 0, 0, 0, 0]));
        assert!(!EndOfFilePacket::is_eof(&[0x00]));
        assert!(!EndOfFilePacket::is_eof(&[0xfe; 10]));
    }
}
