use std::io::Cursor;

use byteorder::ReadBytesExt;

use common::err::MResult;

/// AuthSwitchRequest, minus the leading 0xfe marker.
#[derive(Debug)]
pub struct AuthPluginSwitchPacket {
    pub auth_plugin_name: String,
    pub auth_plugin_data: String,
}

impl AuthPluginSwitchPacket {
    pub fn parse(packet: &[u8]) -> MResult<Self> {
        let mut cursor = Cursor::new(packet);

        let auth_plugin_name = read_null_term_string(&mut cursor)?;
        let auth_plugin_data = read_null_term_string(&mut cursor)?;

        Ok(Self {
            auth_plugin_name,
            auth_plugin_data,
        })
    }
}

fn read_null_term_string(cursor: &mut Cursor<&[u8]>) -> MResult<String> {
    let mut bytes = Vec::new();
    while cursor.position() < cursor.get_ref().len() as u64 {
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
    use super::AuthPluginSwitchPacket;

    #[test]
    fn test_parse() {
        let mut packet: Vec<u8> = Vec::new();
        packet.extend_from_slice(b"mysql_native_password\0");
        packet.extend_from_slice(b"12345678901234567890\0");

        let switch = AuthPluginSwitchPacket::parse(&packet).unwrap();
        assert_eq!(switch.auth_plugin_name, "mysql_native_password");
        assert_eq!(switch.auth_plugin_data, "12345678901234567890");
    }
}
