//! Message timestamp normalization
//!
//! Bid messages carry pickup/delivery descriptors in several ambiguous
//! layouts (12-hour with AM/PM, 24-hour, ISO-like, date-only). An ordered
//! list of literal layouts is tried first; if none fully matches, an
//! unanchored extraction pulls a date+time subpattern from anywhere in the
//! string. Date-only results default to 09:00.
//!
//! All results are stamped with one fixed offset: UTC-5. Source messages
//! carry local wall-clock times; the production forwarder treated them as
//! UTC-5 and that convention is kept here.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// Assumed local offset of source messages, in hours east of UTC.
pub const MESSAGE_UTC_OFFSET_HOURS: i32 = -5;

/// Literal layouts tried in order. The bool marks whether the layout
/// carries a time component; date-only layouts default to 09:00.
const LAYOUTS: &[(&str, bool)] = &[
    ("%m/%d/%Y %I:%M %p", true), // 09/30/2025 02:00 AM
    ("%m/%d/%Y %H:%M", true),    // 09/30/2025 14:00
    ("%m-%d-%Y %I:%M %p", true), // 09-30-2025 02:00 AM
    ("%m-%d-%Y %H:%M", true),    // 09-30-2025 14:00
    ("%Y-%m-%d %H:%M", true),    // 2025-09-30 14:00
    ("%Y-%m-%d %I:%M %p", true), // 2025-09-30 02:00 PM
    ("%m/%d/%Y", false),         // 09/30/2025
    ("%m-%d-%Y", false),         // 09-30-2025
    ("%Y-%m-%d", false),         // 2025-09-30
];

/// Hour assumed for date-only descriptors.
const DEFAULT_HOUR: u32 = 9;

static FALLBACK_RX: OnceLock<Regex> = OnceLock::new();

#[allow(clippy::unwrap_used)] // literal pattern, validated by tests
fn fallback_rx() -> &'static Regex {
    FALLBACK_RX.get_or_init(|| {
        Regex::new(r"(?i)(\d{1,2})[/-](\d{1,2})[/-](\d{4})\s+(\d{1,2}):(\d{2})\s*(AM|PM)?")
            .unwrap()
    })
}

/// The fixed offset source messages are assumed to be in.
#[allow(clippy::unwrap_used)] // -5h is always a valid offset
pub fn message_offset() -> FixedOffset {
    FixedOffset::east_opt(MESSAGE_UTC_OFFSET_HOURS * 3600).unwrap()
}

/// Parse a pickup/delivery descriptor into a fixed-offset timestamp.
///
/// Returns `None` when nothing date-like can be extracted. Never errors;
/// an unparseable descriptor degrades to an absent field.
pub fn parse_message_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let offset = message_offset();

    // 1) Literal layouts, first full match wins.
    for &(layout, has_time) in LAYOUTS {
        let naive = if has_time {
            NaiveDateTime::parse_from_str(raw, layout).ok()
        } else {
            NaiveDate::parse_from_str(raw, layout)
                .ok()
                .and_then(|d| d.and_hms_opt(DEFAULT_HOUR, 0, 0))
        };
        if let Some(naive) = naive {
            return naive.and_local_timezone(offset).single();
        }
    }

    // 2) Unanchored fallback: pull m/d/y h:mm [AM|PM] out of anything.
    let caps = fallback_rx().captures(raw)?;
    let month: u32 = caps.get(1)?.as_str().parse().ok()?;
    let day: u32 = caps.get(2)?.as_str().parse().ok()?;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    let mut hour: u32 = caps.get(4)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(5)?.as_str().parse().ok()?;

    if let Some(ampm) = caps.get(6).map(|m| m.as_str().to_ascii_uppercase()) {
        if ampm == "PM" && hour != 12 {
            hour += 12;
        } else if ampm == "AM" && hour == 12 {
            hour = 0;
        }
    }

    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(hour, minute, 0)?
        .and_local_timezone(offset)
        .single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn twelve_hour_layout() {
        let ts = parse_message_timestamp("10/13/2025 04:00 AM").expect("should parse");
        assert_eq!(ts.to_rfc3339(), "2025-10-13T04:00:00-05:00");
    }

    #[test]
    fn twelve_hour_pm() {
        let ts = parse_message_timestamp("10/13/2025 04:14 PM").expect("should parse");
        assert_eq!(ts.hour(), 16);
        assert_eq!(ts.minute(), 14);
    }

    #[test]
    fn twenty_four_hour_layout() {
        let ts = parse_message_timestamp("09/30/2025 14:00").expect("should parse");
        assert_eq!(ts.hour(), 14);
    }

    #[test]
    fn iso_like_layout() {
        let ts = parse_message_timestamp("2025-09-30 14:00").expect("should parse");
        assert_eq!(ts.to_rfc3339(), "2025-09-30T14:00:00-05:00");
    }

    #[test]
    fn date_only_defaults_to_nine_am() {
        let ts = parse_message_timestamp("09/30/2025").expect("should parse");
        assert_eq!(ts.hour(), 9);
        assert_eq!(ts.minute(), 0);
    }

    #[test]
    fn unanchored_fallback_inside_free_text() {
        let ts = parse_message_timestamp("ready by 10/13/2025 04:00 AM at dock 3")
            .expect("should parse via fallback");
        assert_eq!(ts.to_rfc3339(), "2025-10-13T04:00:00-05:00");
    }

    #[test]
    fn fallback_midnight_and_noon() {
        let midnight = parse_message_timestamp("appt 01/02/2025 12:30 AM sharp").expect("parses");
        assert_eq!(midnight.hour(), 0);
        let noon = parse_message_timestamp("appt 01/02/2025 12:30 PM sharp").expect("parses");
        assert_eq!(noon.hour(), 12);
    }

    #[test]
    fn impossible_date_is_absent() {
        assert!(parse_message_timestamp("13/45/2025").is_none());
        assert!(parse_message_timestamp("13/45/2025 10:00 AM").is_none());
    }

    #[test]
    fn garbage_is_absent() {
        assert!(parse_message_timestamp("ASAP").is_none());
        assert!(parse_message_timestamp("").is_none());
    }

    #[test]
    fn fixed_offset_is_utc_minus_five() {
        assert_eq!(message_offset().local_minus_utc(), -5 * 3600);
    }
}
