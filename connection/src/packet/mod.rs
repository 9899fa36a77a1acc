use common::err::mirror_error::MirrorError;
use common::err::MResult;

use crate::packet::error_packet::ErrorPacket;
use crate::packet::response_type::ResponseType;

pub mod auth_switch_packet;
pub mod end_of_file_packet;
pub mod error_packet;
pub mod handshake_packet;
pub mod response_type;
pub mod result_set_column_packet;
pub mod result_set_row_packet;

pub fn check_error_packet(packet: &[u8], message: &str) -> MResult<()> {
    if packet.is_empty() {
        return Err(MirrorError::ProtocolError(format!("{} Empty packet.", message)));
    }

    if packet[0] == ResponseType::ERROR {
        let error = ErrorPacket::parse(&packet[1..])?;
        let message = format!("{} {:?}", message, error);
        return Err(MirrorError::ProtocolError(message));
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::check_error_packet;

    #[test]
    fn test_ok_passes() {
        assert!(check_error_packet(&[0x00, 0x00], "ctx.").is_ok());
    }

    #[test]
    fn test_error_packet() {
        // 0xff, code 1045, sql state marker + state, message
        let mut packet: Vec<u8> = vec![0xff];
        packet.extend_from_slice(&1045u16.to_le_bytes());
        packet.push(b'#');
        packet.extend_from_slice(b"28000");
        packet.extend_from_slice(b"Access denied");

        let err = check_error_packet(&packet, "Auth.").unwrap_err();
        assert!(err.to_string().contains("Access denied"));
    }
}
