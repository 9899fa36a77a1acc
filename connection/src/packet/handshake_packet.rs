use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use common::err::MResult;

use crate::declar::capability_flags;

/// Initial Handshake Packet, protocol version 10.
///
/// ref: https://dev.mysql.com/doc/internals/en/connection-phase-packets.html
#[derive(Debug)]
pub struct HandshakePacket {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,

    /// auth-plugin-data, both parts concatenated.
    pub scramble: String,

    pub server_capabilities: u64,
    pub server_collation: u8,
    pub status_flags: u16,
    pub auth_plugin_name: String,
}

impl HandshakePacket {
    pub fn parse(packet: &[u8]) -> MResult<Self> {
        let mut cursor = Cursor::new(packet);

        let protocol_version = cursor.read_u8()?;
        let server_version = read_null_terminated(&mut cursor)?;
        let connection_id = cursor.read_u32::<LittleEndian>()?;

        let mut scramble_part1 = [0u8; 8];
        cursor.read_exact(&mut scramble_part1)?;
        cursor.read_u8()?; // filler

        let capabilities_low = cursor.read_u16::<LittleEndian>()? as u64;
        let server_collation = cursor.read_u8()?;
        let status_flags = cursor.read_u16::<LittleEndian>()?;
        let capabilities_high = cursor.read_u16::<LittleEndian>()? as u64;
        let server_capabilities = capabilities_low | (capabilities_high << 16);

        let auth_plugin_data_len = cursor.read_u8()?;
        cursor.seek(SeekFrom::Current(10))?; // reserved

        let mut scramble = String::from_utf8_lossy(&scramble_part1).to_string();
        if server_capabilities & capability_flags::CLIENT_SECURE_CONNECTION != 0 {
            let part2_len = std::cmp::max(13, auth_plugin_data_len as i32 - 8) as usize;
            let mut scramble_part2 = vec![0u8; part2_len];
            cursor.read_exact(&mut scramble_part2)?;

            // The second part is null terminated.
            let end = scramble_part2
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(scramble_part2.len());
            scramble.push_str(&String::from_utf8_lossy(&scramble_part2[..end]));
        }

        let mut auth_plugin_name = String::new();
        if server_capabilities & capability_flags::CLIENT_PLUGIN_AUTH != 0 {
            auth_plugin_name = read_null_terminated(&mut cursor)?;
        }

        Ok(Self {
            protocol_version,
            server_version,
            connection_id,
            scramble,
            server_capabilities,
            server_collation,
            status_flags,
            auth_plugin_name,
        })
    }
}

fn read_null_terminated(cursor: &mut Cursor<&[u8]>) -> MResult<String> {
    let mut bytes = Vec::new();
    loop {
        let b = cursor.read_u8()?;
        if b == 0 {
            break;
        }
        bytes.push(b);
    }
    Ok(String::from_utf8_lossy(&bytes).to_string())
}

#[cfg(test)]
mod test {
    use crate::declar::capability_flags;

    use super::HandshakePacket;

    #[test]
    fn test_parse() {
        let capabilities: u64 =
            capability_flags::CLIENT_SECURE_CONNECTION | capability_flags::CLIENT_PLUGIN_AUTH;

        let mut packet: Vec<u8> = Vec::new();
        packet.push(10);
        packet.extend_from_slice(b"8.0.36\0");
        packet.extend_from_slice(&7u32.to_le_bytes());
        packet.extend_from_slice(b"abcdefgh"); // scramble part 1
        packet.push(0); // filler
        packet.extend_from_slice(&((capabilities & 0xffff) as u16).to_le_bytes());
        packet.push(45); // collation
        packet.extend_from_slice(&0u16.to_le_bytes()); // status
        packet.extend_from_slice(&(((capabilities >> 16) & 0xffff) as u16).to_le_bytes());
        packet.push(21); // auth plugin data len
        packet.extend_from_slice(&[0u8; 10]); // reserved
        packet.extend_from_slice(b"ijklmnopqrst\0"); // scramble part 2 (13 bytes with null)
        packet.extend_from_slice(b"caching_sha2_password\0");

        let handshake = HandshakePacket::parse(&packet).unwrap();
        assert_eq!(handshake.protocol_version, 10);
        assert_eq!(handshake.server_version, "8.0.36");
        assert_eq!(handshake.connection_id, 7);
        assert_eq!(handshake.scramble, "abcdefghijklmnopqrst");
        assert_eq!(handshake.auth_plugin_name, "caching_sha2_password");
    }
}
