pub mod column_type;
pub mod column_value;
pub mod position;

/// First event of a binlog file comes after the 4-byte magic number.
pub const FIRST_EVENT_POSITION: usize = 4;
