//! XMLTV timestamp parsing
//!
//! XMLTV encodes times as `YYYYMMDDHHMMSS` optionally followed by a UTC
//! offset, e.g. `20231215120000 +0100`. The combined output passes the raw
//! strings through untouched; parsing here only validates programmes and
//! gives consumers real instants.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

/// Parse an XMLTV timestamp into a UTC instant.
///
/// Timestamps without an offset suffix are treated as UTC.
pub fn parse_xmltv_datetime(value: &str) -> Option<DateTime<Utc>> {
    let mut parts = value.split_whitespace();
    let digits = parts.next()?;
    let offset = parts.next();

    if !digits.is_ascii() || digits.len() < 14 {
        return None;
    }

    let year: i32 = digits.get(0..4)?.parse().ok()?;
    let month: u32 = digits.get(4..6)?.parse().ok()?;
    let day: u32 = digits.get(6..8)?.parse().ok()?;
    let hour: u32 = digits.get(8..10)?.parse().ok()?;
    let minute: u32 = digits.get(10..12)?.parse().ok()?;
    let second: u32 = digits.get(12..14)?.parse().ok()?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    match offset {
        Some(offset_str) => {
            let offset = parse_utc_offset(offset_str)?;
            Some(
                offset
                    .from_local_datetime(&naive)
                    .single()?
                    .with_timezone(&Utc),
            )
        }
        None => Some(Utc.from_utc_datetime(&naive)),
    }
}

/// Parse a UTC offset like `+0100`, `-0530` or `+01:00`.
fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };

    let rest = rest.replace(':', "");
    if rest.len() != 4 || !rest.is_ascii() {
        return None;
    }

    let hours: i32 = rest.get(0..2)?.parse().ok()?;
    let minutes: i32 = rest.get(2..4)?.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
