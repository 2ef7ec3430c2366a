//! Cursor-based decoding primitives shared by the packet codecs.
//!
//! Every decoder takes the buffer and the current position and returns the
//! position right after the decoded value together with the value itself.
//! Reads past the end of the buffer fail with [`Error::ShortBuffer`].

use crate::errors::{Error, Result};

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Borrows `n` bytes starting at `cursor`.
pub fn take(buf: &[u8], cursor: usize, n: usize) -> Result<&[u8]> {
    let remaining = buf.len().saturating_sub(cursor);
    if remaining < n {
        return Err(Error::ShortBuffer {
            needed: n,
            remaining,
        });
    }
    Ok(&buf[cursor..cursor + n])
}

/// Advances the cursor by `n` bytes without decoding them.
pub fn skip(buf: &[u8], cursor: usize, n: usize) -> Result<usize> {
    take(buf, cursor, n).map(|_| cursor + n)
}

/// Checks that `buf` starts with `header` and returns the cursor after it.
pub fn expect_header(buf: &[u8], header: &[u8]) -> Result<usize> {
    let got = take(buf, 0, header.len())?;
    if got != header {
        return Err(Error::HeaderMismatch {
            expected: header.to_vec(),
            got: got.to_vec(),
        });
    }
    Ok(header.len())
}

/// Decodes a null-terminated string. The returned cursor points past the terminator.
pub fn decode_string(buf: &[u8], cursor: usize) -> Result<(usize, String)> {
    let rest = buf.get(cursor..).unwrap_or_default();
    let end = rest.iter().position(|&c| c == 0).ok_or(Error::ShortBuffer {
        needed: rest.len() + 1,
        remaining: rest.len(),
    })?;
    Ok((
        cursor + end + 1,
        String::from_utf8_lossy(&rest[..end]).into_owned(),
    ))
}

pub fn decode_u8(buf: &[u8], cursor: usize) -> Result<(usize, u8)> {
    Ok((cursor + 1, take(buf, cursor, 1)?[0]))
}

pub fn decode_i8(buf: &[u8], cursor: usize) -> Result<(usize, i8)> {
    decode_u8(buf, cursor).map(|(cursor, v)| (cursor, v as i8))
}

/// Decodes a single byte as an ASCII tag character.
pub fn decode_char(buf: &[u8], cursor: usize) -> Result<(usize, char)> {
    decode_u8(buf, cursor).map(|(cursor, v)| (cursor, char::from(v)))
}

pub fn decode_u16_le(buf: &[u8], cursor: usize) -> Result<(usize, u16)> {
    Ok((cursor + 2, LittleEndian::read_u16(take(buf, cursor, 2)?)))
}

/// Decodes a big-endian 32-bit integer.
pub fn decode_i32(buf: &[u8], cursor: usize) -> Result<(usize, i32)> {
    Ok((cursor + 4, BigEndian::read_i32(take(buf, cursor, 4)?)))
}

/// Decodes a little-endian 32-bit integer.
pub fn decode_i32_le(buf: &[u8], cursor: usize) -> Result<(usize, i32)> {
    Ok((cursor + 4, LittleEndian::read_i32(take(buf, cursor, 4)?)))
}

pub fn decode_f32_le(buf: &[u8], cursor: usize) -> Result<(usize, f32)> {
    Ok((cursor + 4, LittleEndian::read_f32(take(buf, cursor, 4)?)))
}

pub fn decode_u64_le(buf: &[u8], cursor: usize) -> Result<(usize, u64)> {
    Ok((cursor + 8, LittleEndian::read_u64(take(buf, cursor, 8)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_string() {
        let data = b"de_dust\0cstrike\0";

        assert_eq!(decode_string(data, 0).unwrap(), (8, "de_dust".to_string()));
        assert_eq!(decode_string(data, 8).unwrap(), (16, "cstrike".to_string()));
    }

    #[test]
    fn test_decode_string_terminator_position() {
        for k in 0..6 {
            let mut data = vec![b'x'; k];
            data.push(0);
            data.extend_from_slice(b"tail\0");

            let (cursor, text) = decode_string(&data, 0).unwrap();

            assert_eq!(cursor, k + 1);
            assert_eq!(text.as_bytes(), &data[..k]);
        }
    }

    #[test]
    fn test_decode_string_unterminated() {
        match decode_string(b"abc", 1) {
            Err(Error::ShortBuffer { needed, remaining }) => {
                assert_eq!((needed, remaining), (3, 2));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(decode_string(b"abc", 10).is_err());
    }

    #[test]
    fn test_decode_i32_byte_orders() {
        let fixtures: Vec<[u8; 4]> = vec![
            [0x00, 0x00, 0x00, 0x00],
            [0x01, 0x02, 0x03, 0x04],
            [0xFF, 0xFF, 0xFF, 0xFF],
            [0x80, 0x00, 0x00, 0x7F],
            [0xDE, 0xAD, 0xBE, 0xEF],
        ];

        for bytes in fixtures {
            let (c1, be) = decode_i32(&bytes, 0).unwrap();
            let (c2, le) = decode_i32_le(&bytes, 0).unwrap();

            assert_eq!((c1, c2), (4, 4));
            assert_eq!(be, le.swap_bytes());
        }

        assert_eq!(decode_i32(&[0x01, 0x02, 0x03, 0x04], 0).unwrap().1, 0x0102_0304);
        assert_eq!(decode_i32_le(&[0x01, 0x02, 0x03, 0x04], 0).unwrap().1, 0x0403_0201);
    }

    #[test]
    fn test_short_reads() {
        let data = [0x01, 0x02, 0x03];

        assert!(matches!(
            decode_i32(&data, 0),
            Err(Error::ShortBuffer {
                needed: 4,
                remaining: 3
            })
        ));
        assert!(decode_u16_le(&data, 2).is_err());
        assert!(decode_u8(&data, 3).is_err());
        assert_eq!(skip(&data, 1, 2).unwrap(), 3);
        assert!(skip(&data, 1, 3).is_err());
    }

    #[test]
    fn test_expect_header() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0x49, 0x11];

        assert_eq!(expect_header(&data, &[0xFF, 0xFF, 0xFF, 0xFF, 0x49]).unwrap(), 5);
        assert!(matches!(
            expect_header(&data, &[0xFF, 0xFF, 0xFF, 0xFF, 0x44]),
            Err(Error::HeaderMismatch { .. })
        ));
        assert!(matches!(
            expect_header(&data[..2], &[0xFF, 0xFF, 0xFF, 0xFF, 0x49]),
            Err(Error::ShortBuffer { .. })
        ));
    }
}
