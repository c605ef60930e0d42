//! Bid message grammar
//!
//! Line-anchored regex captures for the semi-fixed load-bid template.
//! The grammar is deliberately tolerant: only the `New Load Bid: <digits>`
//! line is mandatory. Every other field is independently optional and may be
//! missing, reordered, or interleaved with unrelated lines (decorative
//! banners, promo text). Matching is case-insensitive.

use regex::Regex;
use std::sync::OnceLock;

/// Raw string captures from a bid message, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCaptures {
    /// Digits from the mandatory `New Load Bid:` line.
    pub bid: String,
    /// Raw distance text (digits, optional thousands separators / decimal point).
    pub distance: Option<String>,
    /// Free-text remainder of the `Pickup:` line.
    pub pickup: Option<String>,
    /// Free-text remainder of the `Delivery:` line.
    pub delivery: Option<String>,
    /// Trailing text of every `Stop N:` line, in appearance order.
    pub stops: Vec<String>,
    /// Value of a single `#TAG` line, if present.
    pub tag: Option<String>,
}

/// Compiled grammar. Built once, on first use.
struct BidGrammar {
    bid: Regex,
    distance: Regex,
    pickup: Regex,
    delivery: Regex,
    stop: Regex,
    tag: Regex,
}

static GRAMMAR: OnceLock<BidGrammar> = OnceLock::new();

#[allow(clippy::unwrap_used)] // literal patterns, validated by tests
fn grammar() -> &'static BidGrammar {
    GRAMMAR.get_or_init(|| BidGrammar {
        bid: Regex::new(r"(?im)^\s*New\s+Load\s+Bid:\s*(?P<bid>\d+)\s*$").unwrap(),
        distance: Regex::new(r"(?im)^\s*Distance:\s*(?P<miles>[\d,\.]+)\s*(?:mi|miles)?\s*$")
            .unwrap(),
        pickup: Regex::new(r"(?im)^\s*Pickup:\s*(?P<pickup>.+?)\s*$").unwrap(),
        delivery: Regex::new(r"(?im)^\s*Delivery:\s*(?P<delivery>.+?)\s*$").unwrap(),
        stop: Regex::new(r"(?im)^\s*Stop\s*\d+:\s*(?P<place>.+?)\s*$").unwrap(),
        tag: Regex::new(r"(?im)^\s*#(?P<tag>[A-Za-z0-9_-]+)\s*$").unwrap(),
    })
}

/// Extract raw captures from message text.
///
/// Returns `None` only when the mandatory bid-id line is absent. Absence of
/// any other field degrades to "not present", never to overall failure.
pub fn extract(text: &str) -> Option<RawCaptures> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let g = grammar();

    let bid = g.bid.captures(text)?.name("bid")?.as_str().to_string();

    let distance = g
        .distance
        .captures(text)
        .and_then(|c| c.name("miles"))
        .map(|m| m.as_str().to_string());

    let pickup = g
        .pickup
        .captures(text)
        .and_then(|c| c.name("pickup"))
        .map(|m| m.as_str().trim().to_string());

    let delivery = g
        .delivery
        .captures(text)
        .and_then(|c| c.name("delivery"))
        .map(|m| m.as_str().trim().to_string());

    // Collect all Stop N: lines anywhere, in appearance order.
    // Numbering gaps and duplicate numbers are irrelevant; blank places dropped.
    let stops: Vec<String> = g
        .stop
        .captures_iter(text)
        .filter_map(|c| c.name("place"))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let tag = g
        .tag
        .captures(text)
        .and_then(|c| c.name("tag"))
        .map(|m| m.as_str().to_string());

    Some(RawCaptures {
        bid,
        distance,
        pickup,
        delivery,
        stops,
        tag,
    })
}
