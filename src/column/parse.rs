// Field value parsers shared by the builders and type inference.

use chrono::{Datelike, NaiveDate};

/// Days from 0001-01-01 (CE) to 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Parse an optionally signed decimal integer. Rejects anything but
/// `[+-]?[0-9]+` and values outside i64.
pub fn parse_int(value: &[u8]) -> Option<i64> {
    let (negative, digits) = match value.first()? {
        b'-' => (true, &value[1..]),
        b'+' => (false, &value[1..]),
        _ => (false, value),
    };
    if digits.is_empty() {
        return None;
    }
    // Accumulate negated so i64::MIN parses without overflow.
    let mut acc: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        acc = acc
            .checked_mul(10)?
            .checked_sub((b - b'0') as i64)?;
    }
    if negative {
        Some(acc)
    } else {
        acc.checked_neg()
    }
}

#[inline]
fn digit(b: u8) -> Option<u32> {
    if b.is_ascii_digit() {
        Some((b - b'0') as u32)
    } else {
        None
    }
}

#[inline]
fn digits2(v: &[u8], at: usize) -> Option<u32> {
    Some(digit(v[at])? * 10 + digit(v[at + 1])?)
}

#[inline]
fn digits4(v: &[u8], at: usize) -> Option<u32> {
    Some(digits2(v, at)? * 100 + digits2(v, at + 2)?)
}

/// `YYYY-MM-DD` or `YYYY/MM/DD` (matching separators) to days since epoch.
/// Calendar validity is checked, so `2024-02-30` fails.
pub fn parse_date(value: &[u8]) -> Option<i32> {
    if value.len() != 10 {
        return None;
    }
    let sep = value[4];
    if (sep != b'-' && sep != b'/') || value[7] != sep {
        return None;
    }
    let y = digits4(value, 0)?;
    let m = digits2(value, 5)?;
    let d = digits2(value, 8)?;
    let date = NaiveDate::from_ymd_opt(y as i32, m, d)?;
    Some(date.num_days_from_ce() - EPOCH_DAYS_FROM_CE)
}

/// `YYYY-MM-DD[T ]HH:MM:SS` with optional fractional seconds and timezone
/// (`Z`, `±HH:MM`, `±HHMM`, `±HH`) to microseconds since epoch. A naive
/// timestamp is taken as UTC.
pub fn parse_timestamp(value: &[u8]) -> Option<i64> {
    if value.len() < 19 {
        return None;
    }
    let sep = value[4];
    if (sep != b'-' && sep != b'/') || value[7] != sep {
        return None;
    }
    if value[10] != b'T' && value[10] != b' ' {
        return None;
    }
    if value[13] != b':' || value[16] != b':' {
        return None;
    }
    let y = digits4(value, 0)?;
    let mo = digits2(value, 5)?;
    let d = digits2(value, 8)?;
    let h = digits2(value, 11)?;
    let mi = digits2(value, 14)?;
    let s = digits2(value, 17)?;

    let mut pos = 19;
    let mut micros: u32 = 0;
    if pos < value.len() && value[pos] == b'.' {
        pos += 1;
        let frac_start = pos;
        while pos < value.len() && value[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == frac_start {
            return None;
        }
        // First six fractional digits, zero-padded on the right.
        for i in 0..6 {
            let d = if frac_start + i < pos {
                (value[frac_start + i] - b'0') as u32
            } else {
                0
            };
            micros = micros * 10 + d;
        }
    }

    let offset_secs: i64 = if pos == value.len() {
        0
    } else {
        match value[pos] {
            b'Z' if pos + 1 == value.len() => 0,
            sign @ (b'+' | b'-') => {
                pos += 1;
                let rest = value.len() - pos;
                let (oh, om) = match rest {
                    2 => (digits2(value, pos)?, 0),
                    4 => (digits2(value, pos)?, digits2(value, pos + 2)?),
                    5 if value[pos + 2] == b':' => {
                        (digits2(value, pos)?, digits2(value, pos + 3)?)
                    }
                    _ => return None,
                };
                let secs = (oh * 3600 + om * 60) as i64;
                if sign == b'-' {
                    -secs
                } else {
                    secs
                }
            }
            _ => return None,
        }
    };

    let date = NaiveDate::from_ymd_opt(y as i32, mo, d)?;
    let datetime = date.and_hms_micro_opt(h, mi, s, micros)?;
    let epoch_micros = datetime.and_utc().timestamp_micros();
    Some(epoch_micros - offset_secs * 1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_basic() {
        assert_eq!(parse_int(b"0"), Some(0));
        assert_eq!(parse_int(b"42"), Some(42));
        assert_eq!(parse_int(b"-42"), Some(-42));
        assert_eq!(parse_int(b"+7"), Some(7));
        assert_eq!(parse_int(b"0042"), Some(42));
    }

    #[test]
    fn test_parse_int_limits() {
        assert_eq!(parse_int(b"9223372036854775807"), Some(i64::MAX));
        assert_eq!(parse_int(b"-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_int(b"9223372036854775808"), None);
        assert_eq!(parse_int(b"-9223372036854775809"), None);
    }

    #[test]
    fn test_parse_int_rejects() {
        assert_eq!(parse_int(b""), None);
        assert_eq!(parse_int(b"-"), None);
        assert_eq!(parse_int(b"1.5"), None);
        assert_eq!(parse_int(b"1e3"), None);
        assert_eq!(parse_int(b" 1"), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(b"1970-01-01"), Some(0));
        assert_eq!(parse_date(b"1970-01-02"), Some(1));
        assert_eq!(parse_date(b"1969-12-31"), Some(-1));
        assert_eq!(parse_date(b"2024/01/02"), Some(19724));
        assert_eq!(parse_date(b"2024-01-02"), Some(19724));
    }

    #[test]
    fn test_parse_date_rejects() {
        assert_eq!(parse_date(b"2024-1-02"), None);
        assert_eq!(parse_date(b"2024-01/02"), None, "separators must match");
        assert_eq!(parse_date(b"2024-02-30"), None, "calendar-invalid");
        assert_eq!(parse_date(b"2024-13-01"), None);
        assert_eq!(parse_date(b"20240102"), None);
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp(b"1970-01-01T00:00:00"), Some(0));
        assert_eq!(parse_timestamp(b"1970-01-01 00:00:01"), Some(1_000_000));
        assert_eq!(
            parse_timestamp(b"1970-01-01T00:00:00.5"),
            Some(500_000)
        );
        assert_eq!(
            parse_timestamp(b"1970-01-01T00:00:00.123456789"),
            Some(123_456),
            "nanoseconds truncate to micros"
        );
        assert_eq!(parse_timestamp(b"1970-01-01T01:00:00Z"), Some(3_600_000_000));
        assert_eq!(
            parse_timestamp(b"1970-01-01T01:00:00+01:00"),
            Some(0),
            "offset normalizes to UTC"
        );
        assert_eq!(parse_timestamp(b"1970-01-01T01:00:00+0100"), Some(0));
        assert_eq!(parse_timestamp(b"1970-01-01T01:00:00-01"), Some(7_200_000_000));
    }

    #[test]
    fn test_parse_timestamp_rejects() {
        assert_eq!(parse_timestamp(b"1970-01-01T25:00:00"), None);
        assert_eq!(parse_timestamp(b"1970-01-01T00:61:00"), None);
        assert_eq!(parse_timestamp(b"1970-01-01"), None);
        assert_eq!(parse_timestamp(b"1970-01-01T00:00:00."), None);
        assert_eq!(parse_timestamp(b"1970-01-01T00:00:00X"), None);
        assert_eq!(parse_timestamp(b"1970-01-01T00:00:00+1"), None);
    }
}
