use num_enum::{FromPrimitive, IntoPrimitive};
use serde::Serialize;

/// Binlog event type codes.
///
/// ref: https://dev.mysql.com/doc/internals/en/binlog-event-type.html
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum EventType {
    #[num_enum(default)]
    Unknown = 0,
    Query = 2,
    Stop = 3,
    Rotate = 4,
    Xid = 16,
    FormatDescription = 15,
    TableMap = 19,

    WriteRowsV1 = 23,
    UpdateRowsV1 = 24,
    DeleteRowsV1 = 25,

    Heartbeat = 27,

    WriteRows = 30,
    UpdateRows = 31,
    DeleteRows = 32,

    Gtid = 33,
    AnonymousGtid = 34,
    PreviousGtids = 35,
}

impl EventType {
    pub fn is_row_event(&self) -> bool {
        matches!(
            self,
            EventType::WriteRows
                | EventType::UpdateRows
                | EventType::DeleteRows
                | EventType::WriteRowsV1
                | EventType::UpdateRowsV1
                | EventType::DeleteRowsV1
        )
    }

    /// V1 row events carry no extra-data block in the post-header.
    pub fn is_row_event_v1(&self) -> bool {
        matches!(
            self,
            EventType::WriteRowsV1 | EventType::UpdateRowsV1 | EventType::DeleteRowsV1
        )
    }
}

#[cfg(test)]
mod test {
    use super::EventType;

    #[test]
    fn test_codes() {
        assert_eq!(u8::from(EventType::TableMap), 19);
        assert_eq!(EventType::from(30u8), EventType::WriteRows);
        assert_eq!(EventType::from(200u8), EventType::Unknown);
    }

    #[test]
    fn test_row_events() {
        assert!(EventType::UpdateRows.is_row_event());
        assert!(!EventType::UpdateRows.is_row_event_v1());
        assert!(EventType::DeleteRowsV1.is_row_event_v1());
        assert!(!EventType::Query.is_row_event());
    }
}
