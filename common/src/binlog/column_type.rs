use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

/// MYSQL 数据类型
///
/// type def ref: https://dev.mysql.com/doc/internals/en/table-map-event.html
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ColumnType {
    Decimal = 0,
    Tiny = 1,
    Short = 2,
    Long = 3,
    Float = 4,
    Double = 5,
    Null = 6,
    Timestamp = 7,
    LongLong = 8,
    Int24 = 9,
    Date = 10,

    Time = 11,
    DateTime = 12,
    Year = 13,
    NewDate = 14, // internal used
    VarChar = 15,
    Bit = 16,
    Timestamp2 = 17,
    DateTime2 = 18,
    Time2 = 19,

    /// JSON is MySQL 5.7.8+ type.
    Json = 245,
    NewDecimal = 246,
    Enum = 247,       // internal used
    Set = 248,        // internal used
    TinyBlob = 249,   // internal used
    MediumBlob = 250, // internal used
    LongBlob = 251,   // internal used
    Blob = 252,
    VarString = 253,
    String = 254,
    Geometry = 255,
}

#[cfg(test)]
mod test {
    use crate::binlog::column_type::ColumnType;

    #[test]
    fn test() {
        let code = ColumnType::LongBlob;
        assert_eq!(251, u8::from(code));

        let t = ColumnType::try_from(253).unwrap();
        assert_eq!(t, ColumnType::VarString);
    }

    #[test]
    fn test_try_from() {
        let pk = ColumnType::try_from(11u8);
        assert_eq!(pk, Ok(ColumnType::Time));

        let unknown = ColumnType::try_from(111u8);
        assert!(unknown.is_err());
    }
}
