#![allow(dead_code)]

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use common::err::mirror_error::MirrorError;
use common::err::MResult;

/// 取出null终止符之前的字符串
pub fn extract_string(input: &[u8]) -> String {
    let null_end = input.iter().position(|&c| c == b'\0').unwrap_or(input.len());
    String::from_utf8_lossy(&input[0..null_end]).to_string()
}

/// parse len encoded int, return (used_bytes, value).
///
/// ref: https://dev.mysql.com/doc/internals/en/integer.html#packet-Protocol::LengthEncodedInteger
pub fn read_len_enc_num(cursor: &mut Cursor<&[u8]>) -> MResult<(usize, u64)> {
    let lead = cursor.read_u8()?;
    match lead {
        // 0 -- 250
        0..=0xfa => Ok((1, lead as u64)),
        // 252
        0xfc => Ok((3, cursor.read_u16::<LittleEndian>()? as u64)),
        // 253
        0xfd => Ok((4, cursor.read_u24::<LittleEndian>()? as u64)),
        // 254
        0xfe => Ok((9, cursor.read_u64::<LittleEndian>()?)),
        other => Err(MirrorError::DecodeError(format!(
            "unexpected length-encoded integer lead byte {:#04x}",
            other
        ))),
    }
}

/// parse length encoded string
///
/// ref: https://dev.mysql.com/doc/internals/en/string.html#packet-Protocol::LengthEncodedString
pub fn read_len_enc_str(cursor: &mut Cursor<&[u8]>) -> MResult<String> {
    let (_, len) = read_len_enc_num(cursor)?;
    read_string(cursor, len as usize)
}

/// As [`read_len_enc_str`], but a 0xfb lead byte means SQL NULL.
pub fn read_len_enc_str_allow_null(cursor: &mut Cursor<&[u8]>) -> MResult<Option<String>> {
    if cursor.position() < cursor.get_ref().len() as u64 {
        let lead = cursor.get_ref()[cursor.position() as usize];
        if lead == 0xfb {
            cursor.set_position(cursor.position() + 1);
            return Ok(None);
        }
    }

    Ok(Some(read_len_enc_str(cursor)?))
}

/// parse 'null terminated string', consume null byte
pub fn read_null_term_string(cursor: &mut Cursor<&[u8]>) -> MResult<String> {
    let mut bytes = Vec::new();
    loop {
        let b = cursor.read_u8()?;
        if b == 0x00 {
            break;
        }
        bytes.push(b);
    }

    Ok(String::from_utf8_lossy(&bytes).to_string())
}

/// 定长编码取值。 第一个byte申明长度len，后续len个byte为存储的值
pub fn read_fixed_len_string(cursor: &mut Cursor<&[u8]>) -> MResult<(u8, String)> {
    let len = cursor.read_u8()?;
    let value = read_string(cursor, len as usize)?;

    Ok((len, value))
}

pub fn read_string(cursor: &mut Cursor<&[u8]>, len: usize) -> MResult<String> {
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes)?;

    Ok(String::from_utf8_lossy(&bytes).to_string())
}

/// Reads a column bitmap in little-endian bytes order.
pub fn read_bitmap_little_endian(cursor: &mut Cursor<&[u8]>, bits: usize) -> MResult<Vec<bool>> {
    let mut result = vec![false; bits];

    let mask_len = (bits + 7) / 8;
    for byte in 0..mask_len {
        let flag = cursor.read_u8()?;
        if flag == 0 {
            continue;
        }

        for y in 0..8 {
            let index = (byte << 3) + y;
            if index == bits {
                break;
            }
            result[index] = (flag & (1 << y)) > 0;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::{
        extract_string, read_bitmap_little_endian, read_len_enc_num, read_len_enc_str_allow_null,
        read_null_term_string,
    };

    #[test]
    fn test_extract_string() {
        assert_eq!(extract_string(b"abc\0def"), "abc");
        assert_eq!(extract_string(b"abc"), "abc");
    }

    #[test]
    fn test_len_enc_num() {
        let payload: Vec<u8> = vec![0xfa];
        let mut cursor = Cursor::new(payload.as_slice());
        assert_eq!(read_len_enc_num(&mut cursor).unwrap(), (1, 250));

        let payload: Vec<u8> = vec![0xfc, 0x01, 0x02];
        let mut cursor = Cursor::new(payload.as_slice());
        assert_eq!(read_len_enc_num(&mut cursor).unwrap(), (3, 0x0201));
    }

    #[test]
    fn test_null_term_string() {
        let payload: Vec<u8> = vec![b'h', b'i', 0x00, b'x'];
        let mut cursor = Cursor::new(payload.as_slice());
        assert_eq!(read_null_term_string(&mut cursor).unwrap(), "hi");
    }

    #[test]
    fn test_len_enc_str_null() {
        let payload: Vec<u8> = vec![0xfb, 0x02, b'o', b'k'];
        let mut cursor = Cursor::new(payload.as_slice());
        assert_eq!(read_len_enc_str_allow_null(&mut cursor).unwrap(), None);
        assert_eq!(
            read_len_enc_str_allow_null(&mut cursor).unwrap(),
            Some("ok".to_string())
        );
    }

    #[test]
    fn test_bitmap() {
        let payload: Vec<u8> = vec![0b0000_0101];
        let mut cursor = Cursor::new(payload.as_slice());
        let bitmap = read_bitmap_little_endian(&mut cursor, 3).unwrap();
        assert_eq!(bitmap, vec![true, false, true]);
    }
}
