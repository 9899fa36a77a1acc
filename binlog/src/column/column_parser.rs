use std::io::{Cursor, Read};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use common::binlog::column_value::{Date, DateTime, Time};
use common::err::MResult;

/// Per-cell wire decoders.
///
/// See <a href="https://dev.mysql.com/doc/internals/en/date-and-time-data-type-representation.html">Docs</a>

/// VARCHAR / VARSTRING / CHAR. Metadata is the declared maximum length.
pub fn parse_string(cursor: &mut Cursor<&[u8]>, metadata: u16) -> MResult<String> {
    let length = if metadata < 256 {
        cursor.read_u8()? as usize
    } else {
        cursor.read_u16::<LittleEndian>()? as usize
    };

    let mut bytes = vec![0u8; length];
    cursor.read_exact(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).to_string())
}

/// BLOB family. Metadata is the number of length bytes.
pub fn parse_blob(cursor: &mut Cursor<&[u8]>, metadata: u16) -> MResult<Vec<u8>> {
    let length = cursor.read_uint::<LittleEndian>(metadata as usize)? as usize;

    let mut bytes = vec![0u8; length];
    cursor.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// BIT. Metadata packs (bits % 8, bytes).
pub fn parse_bit(cursor: &mut Cursor<&[u8]>, metadata: u16) -> MResult<Vec<bool>> {
    let bits = ((metadata >> 8) * 8 + (metadata & 0xff)) as usize;
    let length = (bits + 7) / 8;

    let mut bytes = vec![0u8; length];
    cursor.read_exact(&mut bytes)?;

    // Stored big-endian, high bit first.
    let mut result = Vec::with_capacity(bits);
    for i in 0..bits {
        let byte = bytes[length - 1 - (i >> 3)];
        result.push((byte & (1 << (i & 7))) > 0);
    }
    result.reverse();

    Ok(result)
}

pub fn parse_year(cursor: &mut Cursor<&[u8]>, _metadata: u16) -> MResult<u16> {
    Ok(1900 + cursor.read_u8()? as u16)
}

/// DATE: 3 bytes little endian, day 5 bits, month 4 bits, year the rest.
pub fn parse_date(cursor: &mut Cursor<&[u8]>, _metadata: u16) -> MResult<Date> {
    let value = cursor.read_u24::<LittleEndian>()?;

    Ok(Date {
        day: (value & 0x1f) as u8,
        month: ((value >> 5) & 0x0f) as u8,
        year: (value >> 9) as u16,
    })
}

/// TIME before 5.6.4: 3 bytes little endian, HHMMSS as a decimal number.
pub fn parse_time(cursor: &mut Cursor<&[u8]>, _metadata: u16) -> MResult<Time> {
    let value = cursor.read_u24::<LittleEndian>()?;

    Ok(Time {
        hour: (value / 10000) as i16,
        minute: ((value % 10000) / 100) as u8,
        second: (value % 100) as u8,
        millis: 0,
    })
}

/// TIME2: 3 bytes big endian packed, then fractional seconds.
pub fn parse_time2(cursor: &mut Cursor<&[u8]>, metadata: u16) -> MResult<Time> {
    let packed = cursor.read_u24::<BigEndian>()? as i64 - 0x80_0000;
    let negative = packed < 0;
    let abs = packed.abs();

    let mut hour = ((abs >> 12) & 0x3ff) as i16;
    if negative {
        hour = -hour;
    }

    Ok(Time {
        hour,
        minute: ((abs >> 6) & 0x3f) as u8,
        second: (abs & 0x3f) as u8,
        millis: parse_fractional(cursor, metadata)?,
    })
}

/// TIMESTAMP before 5.6.4: 4 bytes little endian epoch seconds.
pub fn parse_timestamp(cursor: &mut Cursor<&[u8]>, _metadata: u16) -> MResult<u64> {
    let seconds = cursor.read_u32::<LittleEndian>()? as u64;
    Ok(seconds * 1000)
}

/// TIMESTAMP2: 4 bytes big endian epoch seconds, then fractional seconds.
pub fn parse_timestamp2(cursor: &mut Cursor<&[u8]>, metadata: u16) -> MResult<u64> {
    let seconds = cursor.read_u32::<BigEndian>()? as u64;
    let millis = parse_fractional(cursor, metadata)? as u64;
    Ok(seconds * 1000 + millis)
}

/// DATETIME before 5.6.4: 8 bytes little endian, YYYYMMDDHHMMSS as a decimal
/// number.
pub fn parse_date_time(cursor: &mut Cursor<&[u8]>, _metadata: u16) -> MResult<DateTime> {
    let value = cursor.read_u64::<LittleEndian>()?;
    let date = value / 1_000_000;
    let time = value % 1_000_000;

    Ok(DateTime {
        year: (date / 10000) as u16,
        month: ((date % 10000) / 100) as u8,
        day: (date % 100) as u8,
        hour: (time / 10000) as u8,
        minute: ((time % 10000) / 100) as u8,
        second: (time % 100) as u8,
        millis: 0,
    })
}

/// DATETIME2: 5 bytes big endian packed, then fractional seconds.
pub fn parse_date_time2(cursor: &mut Cursor<&[u8]>, metadata: u16) -> MResult<DateTime> {
    let packed = cursor.read_uint::<BigEndian>(5)? as i64 - 0x80_0000_0000;
    let year_month = (packed >> 22) & 0x1_ffff;

    Ok(DateTime {
        year: (year_month / 13) as u16,
        month: (year_month % 13) as u8,
        day: ((packed >> 17) & 0x1f) as u8,
        hour: ((packed >> 12) & 0x1f) as u8,
        minute: ((packed >> 6) & 0x3f) as u8,
        second: (packed & 0x3f) as u8,
        millis: parse_fractional(cursor, metadata)?,
    })
}

/// Fractional-second suffix of the *2 temporal types. Metadata is the fsp.
fn parse_fractional(cursor: &mut Cursor<&[u8]>, metadata: u16) -> MResult<u32> {
    let length = ((metadata + 1) / 2) as usize;
    if length == 0 {
        return Ok(0);
    }

    let fraction = cursor.read_uint::<BigEndian>(length)? as u32;
    // Scale to microseconds, report millis.
    let micros = fraction * 100u32.pow(3 - length as u32);
    Ok(micros / 1000)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_parse_string_short() {
        let payload: Vec<u8> = vec![2, b'h', b'i'];
        let mut cursor = Cursor::new(payload.as_slice());
        assert_eq!(parse_string(&mut cursor, 100).unwrap(), "hi");
    }

    #[test]
    fn test_parse_blob() {
        let payload: Vec<u8> = vec![3, 0, 1, 2, 3];
        let mut cursor = Cursor::new(payload.as_slice());
        assert_eq!(parse_blob(&mut cursor, 2).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_date() {
        // 2024-03-09 => (2024 << 9) | (3 << 5) | 9
        let value: u32 = (2024 << 9) | (3 << 5) | 9;
        let payload = value.to_le_bytes()[0..3].to_vec();
        let mut cursor = Cursor::new(payload.as_slice());

        let date = parse_date(&mut cursor, 0).unwrap();
        assert_eq!((date.year, date.month, date.day), (2024, 3, 9));
    }

    #[test]
    fn test_parse_time2() {
        // 13:21:05
        let packed: u32 = 0x80_0000 | (13 << 12) | (21 << 6) | 5;
        let payload = [
            ((packed >> 16) & 0xff) as u8,
            ((packed >> 8) & 0xff) as u8,
            (packed & 0xff) as u8,
        ];
        let mut cursor = Cursor::new(&payload[..]);

        let time = parse_time2(&mut cursor, 0).unwrap();
        assert_eq!((time.hour, time.minute, time.second), (13, 21, 5));
    }

    #[test]
    fn test_parse_date_time2() {
        // 2024-03-09 13:21:05
        let year_month: i64 = 2024 * 13 + 3;
        let packed: i64 = 0x80_0000_0000 | (year_month << 22) | (9 << 17) | (13 << 12) | (21 << 6) | 5;
        let payload = [
            ((packed >> 32) & 0xff) as u8,
            ((packed >> 24) & 0xff) as u8,
            ((packed >> 16) & 0xff) as u8,
            ((packed >> 8) & 0xff) as u8,
            (packed & 0xff) as u8,
        ];
        let mut cursor = Cursor::new(&payload[..]);

        let dt = parse_date_time2(&mut cursor, 0).unwrap();
        assert_eq!((dt.year, dt.month, dt.day), (2024, 3, 9));
        assert_eq!((dt.hour, dt.minute, dt.second), (13, 21, 5));
    }

    #[test]
    fn test_parse_year() {
        let payload: Vec<u8> = vec![124];
        let mut cursor = Cursor::new(payload.as_slice());
        assert_eq!(parse_year(&mut cursor, 0).unwrap(), 2024);
    }
}
