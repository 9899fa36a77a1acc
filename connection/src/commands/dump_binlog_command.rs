use std::io::{self, Cursor, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::commands::command::CommandType;

/// Send the master into dump mode from the given coordinates.
pub const BINLOG_DUMP_BLOCKING: u16 = 0;
/// Master replies EOF instead of blocking when the log is exhausted.
pub const BINLOG_DUMP_NON_BLOCK: u16 = 1;

pub struct DumpBinlogCommand {
    pub server_id: u32,
    pub binlog_filename: String,
    pub binlog_position: u64,
    pub flags: u16,
}

impl DumpBinlogCommand {
    pub fn new(server_id: u32, binlog_filename: String, binlog_position: u64) -> Self {
        Self {
            server_id,
            binlog_filename,
            binlog_position,
            flags: BINLOG_DUMP_BLOCKING,
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, io::Error> {
        let mut vec = Vec::new();
        let mut cursor = Cursor::new(&mut vec);

        cursor.write_u8(CommandType::BinlogDump as u8)?;
        cursor.write_u32::<LittleEndian>(self.binlog_position as u32)?;
        cursor.write_u16::<LittleEndian>(self.flags)?;
        cursor.write_u32::<LittleEndian>(self.server_id)?;
        cursor.write_all(self.binlog_filename.as_bytes())?;

        Ok(vec)
    }
}

#[cfg(test)]
mod test {
    use super::DumpBinlogCommand;

    #[test]
    fn test_serialize() {
        let command = DumpBinlogCommand::new(1001, "bin.000001".to_string(), 4);
        let bytes = command.serialize().unwrap();

        assert_eq!(bytes[0], 18);
        assert_eq!(&bytes[1..5], &4u32.to_le_bytes());
        assert_eq!(&bytes[5..7], &0u16.to_le_bytes());
        assert_eq!(&bytes[7..11], &1001u32.to_le_bytes());
        assert_eq!(&bytes[11..], b"bin.000001");
    }
}
