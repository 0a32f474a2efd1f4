//! LEB128 variable-length integers.
//!
//! Decoders take a slice starting at the first byte of the value and return
//! the value with the number of bytes consumed. They never read past the end
//! of the slice and never allocate.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LebError {
    #[error("unexpected end of buffer")]
    UnexpectedEnd,
    #[error("integer representation too long or too large")]
    IntegerOverflow,
}

pub type LebResult<T> = Result<(T, usize), LebError>;

fn read_unsigned(data: &[u8], bits: u32) -> LebResult<u64> {
    let max_len = bits.div_ceil(7) as usize;
    let mut result = 0u64;
    for i in 0..max_len {
        let byte = *data.get(i).ok_or(LebError::UnexpectedEnd)?;
        let shift = 7 * i as u32;
        if i == max_len - 1 {
            // Continuation bit plus any payload bits beyond the target width.
            let unused = 0xffu8 << (bits - shift);
            if byte & unused != 0 {
                return Err(LebError::IntegerOverflow);
            }
        }
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }
    Err(LebError::IntegerOverflow)
}

fn read_signed(data: &[u8], bits: u32) -> LebResult<i64> {
    let max_len = bits.div_ceil(7) as usize;
    let mut result = 0i64;
    for i in 0..max_len {
        let byte = *data.get(i).ok_or(LebError::UnexpectedEnd)?;
        let shift = 7 * i as u32;
        if i == max_len - 1 {
            if byte & 0x80 != 0 {
                return Err(LebError::IntegerOverflow);
            }
            // Bits above the target width must repeat the sign bit.
            let used = bits - shift;
            let unused = 0x7f & (0xffu8 << used);
            let sign = 1u8 << (used - 1);
            let expected = if byte & sign != 0 { unused } else { 0 };
            if byte & unused != expected {
                return Err(LebError::IntegerOverflow);
            }
        }
        result |= i64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            let consumed = shift + 7;
            if consumed < 64 && byte & 0x40 != 0 {
                result |= -1i64 << consumed;
            }
            return Ok((result, i + 1));
        }
    }
    Err(LebError::IntegerOverflow)
}

pub fn read_u32(data: &[u8]) -> LebResult<u32> {
    let (value, len) = read_unsigned(data, 32)?;
    Ok((value as u32, len))
}

pub fn read_u64(data: &[u8]) -> LebResult<u64> {
    read_unsigned(data, 64)
}

pub fn read_i32(data: &[u8]) -> LebResult<i32> {
    let (value, len) = read_signed(data, 32)?;
    Ok((value as i32, len))
}

/// Signed 33-bit value, used by block types.
pub fn read_s33(data: &[u8]) -> LebResult<i64> {
    read_signed(data, 33)
}

pub fn read_i64(data: &[u8]) -> LebResult<i64> {
    read_signed(data, 64)
}

pub fn write_u32(out: &mut Vec<u8>, value: u32) {
    write_u64(out, u64::from(value));
}

pub fn write_u64(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

pub fn write_i32(out: &mut Vec<u8>, value: i32) {
    write_i64(out, i64::from(value));
}

pub fn write_i64(out: &mut Vec<u8>, mut value: i64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decodes_known_encodings() {
        assert_eq!(read_u32(&[0x00]), Ok((0, 1)));
        assert_eq!(read_u32(&[0xe5, 0x8e, 0x26]), Ok((624485, 3)));
        assert_eq!(read_u32(&[0xff, 0xff, 0xff, 0xff, 0x0f]), Ok((u32::MAX, 5)));
        assert_eq!(read_i32(&[0x7f]), Ok((-1, 1)));
        assert_eq!(read_i32(&[0xc0, 0xbb, 0x78]), Ok((-123456, 3)));
        assert_eq!(read_i64(&[0x80, 0x7f]), Ok((-128, 2)));
        assert_eq!(read_s33(&[0x40]), Ok((-64, 1)));
    }

    #[test]
    fn padded_encodings_within_width_are_accepted() {
        assert_eq!(read_u32(&[0x83, 0x80, 0x80, 0x80, 0x00]), Ok((3, 5)));
        assert_eq!(read_i32(&[0xff, 0xff, 0xff, 0xff, 0x7f]), Ok((-1, 5)));
    }

    #[test]
    fn rejects_overlong_and_oversized_values() {
        assert_eq!(
            read_u32(&[0xff, 0xff, 0xff, 0xff, 0x1f]),
            Err(LebError::IntegerOverflow)
        );
        assert_eq!(
            read_u32(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x00]),
            Err(LebError::IntegerOverflow)
        );
        assert_eq!(
            read_i32(&[0xff, 0xff, 0xff, 0xff, 0x4f]),
            Err(LebError::IntegerOverflow)
        );
        assert_eq!(
            read_u64(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02]),
            Err(LebError::IntegerOverflow)
        );
    }

    #[test]
    fn missing_terminator_is_unexpected_end() {
        assert_eq!(read_u32(&[]), Err(LebError::UnexpectedEnd));
        assert_eq!(read_u32(&[0x80, 0x80]), Err(LebError::UnexpectedEnd));
        assert_eq!(read_i64(&[0xff]), Err(LebError::UnexpectedEnd));
    }

    proptest! {
        #[test]
        fn u32_round_trips(value: u32) {
            let mut buf = Vec::new();
            write_u32(&mut buf, value);
            prop_assert_eq!(read_u32(&buf), Ok((value, buf.len())));
        }

        #[test]
        fn i32_round_trips(value: i32) {
            let mut buf = Vec::new();
            write_i32(&mut buf, value);
            prop_assert_eq!(read_i32(&buf), Ok((value, buf.len())));
        }

        #[test]
        fn u64_round_trips(value: u64) {
            let mut buf = Vec::new();
            write_u64(&mut buf, value);
            prop_assert_eq!(read_u64(&buf), Ok((value, buf.len())));
        }

        #[test]
        fn i64_round_trips(value: i64) {
            let mut buf = Vec::new();
            write_i64(&mut buf, value);
            prop_assert_eq!(read_i64(&buf), Ok((value, buf.len())));
        }

        #[test]
        fn truncated_encodings_fail_with_unexpected_end(value: u32) {
            let mut buf = Vec::new();
            write_u32(&mut buf, value);
            for len in 0..buf.len() {
                prop_assert_eq!(read_u32(&buf[..len]), Err(LebError::UnexpectedEnd));
            }
        }
    }
}
