use nom::number::complete::{le_u16, le_u32, le_u8};
use nom::IResult;
use serde::Serialize;

/// Common header length of a v4 binlog event.
pub const HEADER_LEN: usize = 19;

/////////////////////////////////////
///  Event Header
///
/// 从mysql5.0版本开始，binlog采用v4版本，每个event都有一个19字节的header。
/// binlog 采用小端序列。
///
/// ```text
///                      [startPos : Len]
/// +=====================================+
/// | event  | timestamp         0 : 4    |
/// | header +----------------------------+
/// |        | event_type        4 : 1    |
/// |        +----------------------------+
/// |        | server_id         5 : 4    |
/// |        +----------------------------+
/// |        | event_length      9 : 4    |
/// |        +----------------------------+
/// |        | next_position    13 : 4    |
/// |        +----------------------------+
/// |        | flags            17 : 2    |
/// +=====================================+
/// ```
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct Header {
    /// Creation time in seconds from Unix.
    pub when: u32,

    /// Type code of the binlog event.
    pub event_type: u8,

    /// Which server the binlog originated from; used to break replication loops.
    pub server_id: u32,

    /// Event length (header + body + checksum).
    pub event_length: u32,

    /// File position of the next event.
    pub next_position: u32,

    pub flags: u16,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            when: 0,
            event_type: 0,
            server_id: 0,
            event_length: 0,
            next_position: 0,
            flags: 0,
        }
    }
}

impl Header {
    pub fn parse(input: &[u8]) -> IResult<&[u8], Header> {
        let (i, when) = le_u32(input)?;
        let (i, event_type) = le_u8(i)?;
        let (i, server_id) = le_u32(i)?;
        let (i, event_length) = le_u32(i)?;
        let (i, next_position) = le_u32(i)?;
        let (i, flags) = le_u16(i)?;

        Ok((
            i,
            Header {
                when,
                event_type,
                server_id,
                event_length,
                next_position,
                flags,
            },
        ))
    }

    pub fn get_event_type(&self) -> u8 {
        self.event_type
    }

    pub fn get_event_length(&self) -> u32 {
        self.event_length
    }

    pub fn get_next_position(&self) -> u32 {
        self.next_position
    }
}

#[cfg(test)]
mod test {
    use super::{Header, HEADER_LEN};

    #[test]
    fn test_parse() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&100u32.to_le_bytes()); // when
        payload.push(19); // table map
        payload.extend_from_slice(&1u32.to_le_bytes()); // server id
        payload.extend_from_slice(&51u32.to_le_bytes()); // event length
        payload.extend_from_slice(&500u32.to_le_bytes()); // next position
        payload.extend_from_slice(&0u16.to_le_bytes()); // flags
        assert_eq!(payload.len(), HEADER_LEN);

        let (rest, header) = Header::parse(&payload).unwrap();
        assert!(rest.is_empty());
        assert_eq!(header.event_type, 19);
        assert_eq!(header.event_length, 51);
        assert_eq!(header.next_position, 500);
    }
}
