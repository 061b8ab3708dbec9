//! Count and length fields.
//!
//! Both `*<count>\r\n` and `$<len>\r\n` carry a non-negative decimal bounded
//! to ten digits and `i32::MAX`. The digit run is measured with the digit
//! bitmap (its first unset bit), and its terminator is located with the CRLF
//! bitmap, so no byte of the run is tested individually.

use crate::protocol::types::{ProtocolError, CRLF, MAX_DIGITS, MAX_NUMBER};
use crate::scan::{ByteClass, Lockstep};

/// Why a number could not be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberError {
    /// The buffer ends before the terminator.
    Incomplete,
    /// The field is malformed.
    Invalid(ProtocolError),
}

/// Accumulates a run of ASCII digits. The run holds at most ten digits, so
/// the result fits in a `u64`.
#[inline]
fn accumulate(digits: &[u8]) -> u64 {
    digits
        .iter()
        .fold(0u64, |acc, &digit| acc * 10 + u64::from(digit - b'0'))
}

/// Takes a decimal field followed by `\r\n` at the cursor.
///
/// On success the cursor moves past the terminator and the value is
/// returned. Leading zeros are accepted, as is `0`. On
/// [`NumberError::Invalid`] the cursor rests on the offending byte; on
/// [`NumberError::Incomplete`] it does not move.
pub fn take_positive_number(cursor: &mut Lockstep<'_>) -> Result<u32, NumberError> {
    let remaining = cursor.remaining();
    let run = cursor.run_length(ByteClass::Digit);

    if run > MAX_DIGITS {
        cursor.advance(MAX_DIGITS);
        return Err(NumberError::Invalid(ProtocolError::NumberTooLong));
    }
    if run == remaining {
        return Err(NumberError::Incomplete);
    }
    if run == 0 {
        return Err(NumberError::Invalid(ProtocolError::InvalidNumber));
    }

    if cursor.find_next(ByteClass::CrLf) != run {
        // A lone '\r' as the final byte may still be completed by an '\n'.
        if run + 1 == remaining && cursor.rest()[run] == b'\r' {
            return Err(NumberError::Incomplete);
        }
        cursor.advance(run);
        return Err(NumberError::Invalid(ProtocolError::InvalidNumber));
    }

    let value = accumulate(&cursor.rest()[..run]);
    if value > u64::from(MAX_NUMBER) {
        return Err(NumberError::Invalid(ProtocolError::NumberOverflow));
    }

    cursor.advance(run + CRLF.len());
    Ok(value as u32)
}

/// Parses a digit run terminated by `\r\n`, e.g. `b"1234\r\n"`.
///
/// Rejects a missing terminator, an empty run, non-digits, a leading `0` on
/// anything longer than one digit, more than ten digits and values above
/// `i32::MAX`.
pub fn parse_positive_int(line: &[u8]) -> Option<u32> {
    let digits = line.strip_suffix(CRLF)?;

    if digits.is_empty() || digits.len() > MAX_DIGITS {
        return None;
    }
    if digits.len() > 1 && digits[0] == b'0' {
        return None;
    }
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let value = accumulate(digits);
    (value <= u64::from(MAX_NUMBER)).then_some(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::Bitmaps;
    use proptest::prelude::*;

    fn take(buf: &[u8]) -> (Result<u32, NumberError>, usize) {
        let maps = Bitmaps::scan(buf);
        let mut cursor = Lockstep::new(buf, &maps, 0);
        let result = take_positive_number(&mut cursor);
        (result, cursor.position())
    }

    #[test]
    fn test_take_simple() {
        assert_eq!(take(b"12\r\n"), (Ok(12), 4));
        assert_eq!(take(b"0\r\n$"), (Ok(0), 3));
        assert_eq!(take(b"007\r\n"), (Ok(7), 5));
    }

    #[test]
    fn test_take_max_values() {
        assert_eq!(take(b"2147483647\r\n"), (Ok(2147483647), 12));
        assert_eq!(
            take(b"2147483648\r\n").0,
            Err(NumberError::Invalid(ProtocolError::NumberOverflow))
        );
        assert_eq!(
            take(b"9999999999\r\n").0,
            Err(NumberError::Invalid(ProtocolError::NumberOverflow))
        );
    }

    #[test]
    fn test_take_too_many_digits() {
        assert_eq!(
            take(b"12345678901\r\n"),
            (Err(NumberError::Invalid(ProtocolError::NumberTooLong)), 10)
        );
        // Even when the buffer ends inside the run.
        assert_eq!(
            take(b"123456789012").0,
            Err(NumberError::Invalid(ProtocolError::NumberTooLong))
        );
    }

    #[test]
    fn test_take_incomplete() {
        assert_eq!(take(b""), (Err(NumberError::Incomplete), 0));
        assert_eq!(take(b"12"), (Err(NumberError::Incomplete), 0));
        assert_eq!(take(b"12\r"), (Err(NumberError::Incomplete), 0));
        assert_eq!(take(b"1234567890"), (Err(NumberError::Incomplete), 0));
    }

    #[test]
    fn test_take_invalid() {
        assert_eq!(
            take(b"-1\r\n"),
            (Err(NumberError::Invalid(ProtocolError::InvalidNumber)), 0)
        );
        assert_eq!(
            take(b"\r\n"),
            (Err(NumberError::Invalid(ProtocolError::InvalidNumber)), 0)
        );
        assert_eq!(
            take(b"12x\r\n"),
            (Err(NumberError::Invalid(ProtocolError::InvalidNumber)), 2)
        );
        assert_eq!(
            take(b"12\n"),
            (Err(NumberError::Invalid(ProtocolError::InvalidNumber)), 2)
        );
        assert_eq!(
            take(b"12\rx"),
            (Err(NumberError::Invalid(ProtocolError::InvalidNumber)), 2)
        );
    }

    #[test]
    fn test_take_at_unaligned_offsets() {
        for pad in 0..24 {
            let mut buf = vec![b'x'; pad];
            buf.extend_from_slice(b"1048576\r\n");
            let maps = Bitmaps::scan(&buf);
            let mut cursor = Lockstep::new(&buf, &maps, pad);
            assert_eq!(take_positive_number(&mut cursor), Ok(1_048_576));
            assert_eq!(cursor.position(), buf.len());
        }
    }

    #[test]
    fn test_parse_positive_int() {
        assert_eq!(parse_positive_int(b"0\r\n"), Some(0));
        assert_eq!(parse_positive_int(b"42\r\n"), Some(42));
        assert_eq!(parse_positive_int(b"2147483647\r\n"), Some(2147483647));

        assert_eq!(parse_positive_int(b"\r\n"), None);
        assert_eq!(parse_positive_int(b"42"), None);
        assert_eq!(parse_positive_int(b"042\r\n"), None);
        assert_eq!(parse_positive_int(b"00\r\n"), None);
        assert_eq!(parse_positive_int(b"4a\r\n"), None);
        assert_eq!(parse_positive_int(b"2147483648\r\n"), None);
        assert_eq!(parse_positive_int(b"12345678901\r\n"), None);
    }

    proptest! {
        #[test]
        fn prop_round_trip(v in 1u32..=MAX_NUMBER) {
            let line = format!("{v}\r\n");
            prop_assert_eq!(parse_positive_int(line.as_bytes()), Some(v));
            prop_assert_eq!(take(line.as_bytes()), (Ok(v), line.len()));
        }

        #[test]
        fn prop_above_int32_rejected(v in u64::from(MAX_NUMBER) + 1..10_000_000_000u64) {
            let line = format!("{v}\r\n");
            prop_assert_eq!(parse_positive_int(line.as_bytes()), None);
            prop_assert_eq!(
                take(line.as_bytes()).0,
                Err(NumberError::Invalid(ProtocolError::NumberOverflow))
            );
        }
    }
}
