use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

use common::err::mirror_error::MirrorError;
use common::err::MResult;

/// Checksum algorithm appended to every event when enabled on the source.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ChecksumType {
    None = 0,

    /// CRC32, 4 bytes after the event body.
    Crc32 = 1,
}

impl ChecksumType {
    pub fn from_name(name: &str) -> MResult<Self> {
        match name.to_uppercase().as_str() {
            "NONE" | "" => Ok(ChecksumType::None),
            "CRC32" => Ok(ChecksumType::Crc32),
            other => Err(MirrorError::DecodeError(format!(
                "unknown binlog checksum type {}",
                other
            ))),
        }
    }

    /// Trailing bytes each event carries for this algorithm.
    pub fn length(&self) -> usize {
        match self {
            ChecksumType::None => 0,
            ChecksumType::Crc32 => 4,
        }
    }
}

#[cfg(test)]
mod test {
    use super::ChecksumType;

    #[test]
    fn test_from_name() {
        assert_eq!(ChecksumType::from_name("CRC32").unwrap(), ChecksumType::Crc32);
        assert_eq!(ChecksumType::from_name("none").unwrap(), ChecksumType::None);
        assert_eq!(ChecksumType::from_name("").unwrap(), ChecksumType::None);
        assert!(ChecksumType::from_name("SHA").is_err());
    }

    #[test]
    fn test_length() {
        assert_eq!(ChecksumType::None.length(), 0);
        assert_eq!(ChecksumType::Crc32.length(), 4);
    }
}
