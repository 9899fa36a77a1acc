use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use common::err::MResult;

/// ERR_Packet, minus the leading 0xff marker.
#[derive(Debug)]
pub struct ErrorPacket {
    pub error_code: u16,
    pub sql_state: String,
    pub error_message: String,
}

impl ErrorPacket {
    pub fn parse(packet: &[u8]) -> MResult<Self> {
        let mut cursor = Cursor::new(packet);

        let error_code = cursor.read_u16::<LittleEndian>()?;

        // Protocol 4.1: '#' marker then a 5 byte sql state.
        let mut sql_state = String::new();
        if !packet[2..].is_empty() && packet[2] == b'#' {
            cursor.read_u8()?;
            let mut state = [0u8; 5];
            cursor.read_exact(&mut state)?;
            sql_state = String::from_utf8_lossy(&state).to_string();
        }

        let mut message_raw = Vec::new();
        cursor.read_to_end(&mut message_raw)?;
        let error_message = String::from_utf8_lossy(&message_raw).to_string();

        Ok(Self {
            error_code,
            sql_state,
            error_message,
        })
    }
}

#[cfg(test)]
mod test {
    use super::ErrorPacket;

    #[test]
    fn test_parse() {
        let mut packet: Vec<u8> = Vec::new();
        packet.extend_from_slice(&1146u16.to_le_bytes());
        packet.push(b'#');
        packet.extend_from_slice(b"42S02");
        packet.extend_from_slice(b"Table 'shop.missing' doesn't exist");

        let error = ErrorPacket::parse(&packet).unwrap();
        assert_eq!(error.error_code, 1146);
        assert_eq!(error.sql_state, "42S02");
        assert!(error.error_message.contains("doesn't exist"));
    }
}
