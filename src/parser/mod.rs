//! Bid extraction and normalization
//!
//! Two stages: `grammar` pattern-matches raw text into string captures,
//! then `parse_bid` converts the captures into a typed [`ParsedBid`].
//! Field-level failures (distance, timestamps) degrade to absent values;
//! only a missing or unparseable bid id yields no record at all.

pub mod grammar;
pub mod timestamp;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

pub use grammar::{extract, RawCaptures};
pub use timestamp::{parse_message_timestamp, MESSAGE_UTC_OFFSET_HOURS};

/// A normalized load bid extracted from message text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedBid {
    /// Natural business key, from the mandatory bid-id line.
    pub bid_number: u64,
    /// Distance in miles, when present and numeric.
    pub distance_miles: Option<f64>,
    /// Pickup time at the fixed message offset, when extractable.
    pub pickup_at: Option<DateTime<FixedOffset>>,
    /// Delivery time at the fixed message offset, when extractable.
    pub delivery_at: Option<DateTime<FixedOffset>>,
    /// Stop places in appearance order. May be empty.
    pub stops: Vec<String>,
    /// Upper-cased tag code, when present.
    pub tag: Option<String>,
}

/// Parse message text into a normalized bid record.
///
/// Returns `None` when the text does not contain the mandatory
/// `New Load Bid: <digits>` line or the digits do not fit an integer.
pub fn parse_bid(text: &str) -> Option<ParsedBid> {
    let caps = grammar::extract(text)?;

    // Digit-only capture; an overflowing id is treated as no-match.
    let bid_number: u64 = caps.bid.parse().ok()?;

    let distance_miles = caps
        .distance
        .and_then(|raw| raw.replace(',', "").parse::<f64>().ok());

    let pickup_at = caps.pickup.as_deref().and_then(parse_message_timestamp);
    let delivery_at = caps.delivery.as_deref().and_then(parse_message_timestamp);

    let tag = caps.tag.map(|t| t.to_uppercase());

    Some(ParsedBid {
        bid_number,
        distance_miles,
        pickup_at,
        delivery_at,
        stops: caps.stops,
        tag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const SAMPLE: &str = "\
New Load Bid: 87642971
Distance: 426.0 miles
Pickup: 10/13/2025 04:00 AM
Delivery: 10/13/2025 04:14 PM
Stops:
  Stop 1: WARRENDALE, PA
  Stop 2: WHITE PLAINS, NY
  Stop 3: STAMFORD, CT
#PA";

    #[test]
    fn full_sample_message() {
        let bid = parse_bid(SAMPLE).expect("should parse");
        assert_eq!(bid.bid_number, 87642971);
        assert_eq!(bid.distance_miles, Some(426.0));
        assert_eq!(bid.tag.as_deref(), Some("PA"));
        assert_eq!(
            bid.stops,
            vec!["WARRENDALE, PA", "WHITE PLAINS, NY", "STAMFORD, CT"]
        );
        let pickup = bid.pickup_at.expect("pickup present");
        let delivery = bid.delivery_at.expect("delivery present");
        assert_eq!((pickup.year(), pickup.month(), pickup.day()), (2025, 10, 13));
        assert_eq!((delivery.year(), delivery.month(), delivery.day()), (2025, 10, 13));
    }

    #[test]
    fn missing_tag_leaves_other_fields_unchanged() {
        let text = SAMPLE.replace("#PA", "");
        let bid = parse_bid(&text).expect("should parse");
        assert!(bid.tag.is_none());
        assert_eq!(bid.bid_number, 87642971);
        assert_eq!(bid.distance_miles, Some(426.0));
        assert_eq!(bid.stops.len(), 3);
    }

    #[test]
    fn tag_is_upper_cased() {
        let lower = parse_bid("New Load Bid: 1\n#pa").expect("parses");
        let upper = parse_bid("New Load Bid: 1\n#PA").expect("parses");
        assert_eq!(lower.tag.as_deref(), Some("PA"));
        assert_eq!(upper.tag.as_deref(), Some("PA"));
    }

    #[test]
    fn distance_with_thousands_separators() {
        let bid = parse_bid("New Load Bid: 2\nDistance: 1,234.5 miles").expect("parses");
        assert_eq!(bid.distance_miles, Some(1234.5));
    }

    #[test]
    fn malformed_distance_is_absent_not_fatal() {
        let bid = parse_bid("New Load Bid: 2\nDistance: ,.,. miles").expect("parses");
        assert!(bid.distance_miles.is_none());
        assert_eq!(bid.bid_number, 2);
    }

    #[test]
    fn malformed_pickup_date_is_absent_not_fatal() {
        let bid = parse_bid("New Load Bid: 3\nPickup: 13/45/2025").expect("parses");
        assert!(bid.pickup_at.is_none());
        assert_eq!(bid.bid_number, 3);
    }

    #[test]
    fn no_bid_line_means_no_record() {
        assert!(parse_bid("Distance: 426.0 miles\n#PA").is_none());
    }
}
