use serde::Serialize;

use common::binlog::FIRST_EVENT_POSITION;

use crate::binlog::starting_strategy::StartingStrategy;

/// Replication coordinates the tail connects from.
#[derive(Debug, Serialize, Clone)]
pub struct BinlogOptions {
    /// Binary log file name. Automatically changed on RotateEvent.
    pub filename: String,

    /// Binary log file position.
    pub position: u64,

    pub starting_strategy: StartingStrategy,
}

impl BinlogOptions {
    /// Starts replication from the first available binlog on the source.
    pub fn from_start() -> BinlogOptions {
        BinlogOptions {
            filename: String::new(),
            position: FIRST_EVENT_POSITION as u64,
            starting_strategy: StartingStrategy::FromStart,
        }
    }

    /// Starts replication from the current source end, read on connect.
    pub fn from_end() -> BinlogOptions {
        BinlogOptions {
            filename: String::new(),
            position: 0,
            starting_strategy: StartingStrategy::FromEnd,
        }
    }

    /// Starts replication from specified binlog filename and position.
    pub fn from_position(filename: String, position: u64) -> BinlogOptions {
        BinlogOptions {
            filename,
            position,
            starting_strategy: StartingStrategy::FromPosition,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::binlog::starting_strategy::StartingStrategy;

    use super::BinlogOptions;

    #[test]
    fn test_from_position() {
        let opts = BinlogOptions::from_position("bin.000003".to_string(), 1234);
        assert_eq!(opts.filename, "bin.000003");
        assert_eq!(opts.position, 1234);
        assert_eq!(opts.starting_strategy, StartingStrategy::FromPosition);
    }

    #[test]
    fn test_from_start() {
        let opts = BinlogOptions::from_start();
        assert_eq!(opts.position, 4);
    }
}
