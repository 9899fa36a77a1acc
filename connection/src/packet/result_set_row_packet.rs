use std::io::Cursor;

use binlog::utils::read_len_enc_str_allow_null;
use common::err::MResult;

/// One text-protocol row: every cell a string, NULL as 0xfb.
#[derive(Debug)]
pub struct ResultSetRowPacket {
    pub cells: Vec<Option<String>>,
}

impl ResultSetRowPacket {
    pub fn parse(packet: &[u8]) -> MResult<Self> {
        let mut cursor = Cursor::new(packet);

        let len = cursor.get_ref().len() as u64;
        let mut cells = Vec::new();

        while cursor.position() < len {
            cells.push(read_len_enc_str_allow_null(&mut cursor)?);
        }

        Ok(Self { cells })
    }
}

#[cfg(test)]
mod test {
    use super::ResultSetRowPacket;

    #[test]
    fn test_parse() {
        let mut packet: Vec<u8> = Vec::new();
        packet.push(1);
        packet.push(b'2');
        packet.push(0xfb); // NULL
        packet.push(3);
        packet.extend_from_slice(b"abc");

        let row = ResultSetRowPacket::parse(&packet).unwrap();
        assert_eq!(row.cells[0], Some("2".to_string()));
        assert_eq!(row.cells[1], None);
        assert_eq!(row.cells[2], Some("abc".to_string()));
    }
}
