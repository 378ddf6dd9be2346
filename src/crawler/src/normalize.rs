//! Text-to-value coercion for scraped fields.
//!
//! Every helper returns `None` for text it cannot read, so one bad cell never
//! aborts the surrounding row.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::types::PayoutEntry;

static HORSE_WEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\(([+-]?\d+)\)$").unwrap());

/// Refunds are quoted per 100 yen staked
const REFUND_SCALE: f64 = 100.0;

/// Strip whitespace and thousands separators
fn clean(text: &str) -> String {
    text.chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect()
}

/// Parse an integer field, tolerating thousands separators
pub fn parse_int<T: FromStr>(text: &str) -> Option<T> {
    let cleaned = clean(text);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Parse a decimal field, tolerating thousands separators
pub fn parse_decimal(text: &str) -> Option<f64> {
    let cleaned = clean(text);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Finishing rank. Only plain decimal digits count; 中止, 除外, 取消 and
/// demotion markers like `4(降)` are rejected.
pub fn parse_rank(text: &str) -> Option<u8> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// `m:ss` or `m:ss.s` to seconds
pub fn to_seconds(text: &str) -> Option<f64> {
    let (minutes, seconds) = text.trim().split_once(':')?;
    let minutes: f64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    if minutes < 0.0 || !(0.0..60.0).contains(&seconds) {
        return None;
    }
    Some(60.0 * minutes + seconds)
}

/// Seconds back to `m:ss` / `m:ss.s`, to one decimal place.
///
/// Minutes are never zero-padded, so `to_seconds` followed by this function
/// returns the input only for the `m:ss[.s]` form netkeiba uses; `01:58`
/// comes back as `1:58`.
pub fn seconds_to_text(secs: f64) -> String {
    let tenths = (secs * 10.0).round() as u64;
    let minutes = tenths / 600;
    let rem = tenths % 600;
    if rem % 10 == 0 {
        format!("{}:{:02}", minutes, rem / 10)
    } else {
        format!("{}:{:02}.{}", minutes, rem / 10, rem % 10)
    }
}

/// `480(+6)` to `(480, 6)`. Anything else (計不, blank) yields `None` for both.
pub fn parse_horse_weight(text: &str) -> Option<(u32, i32)> {
    let caps = HORSE_WEIGHT_RE.captures(text.trim())?;
    let weight = caps[1].parse().ok()?;
    let change = caps[2].trim_start_matches('+').parse().ok()?;
    Some((weight, change))
}

/// Join amount tokens with single spaces after dropping separators
pub fn normalize_amounts(text: &str) -> String {
    text.split_whitespace()
        .map(|t| t.replace(',', ""))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pair each place winner with its refund scaled to a per-yen payout
pub fn place_payouts(entry: &PayoutEntry) -> Vec<(u8, f64)> {
    let numbers: Vec<&str> = entry.combination.split_whitespace().collect();
    let refunds: Vec<&str> = entry.refund.split_whitespace().collect();

    if numbers.len() != refunds.len() {
        warn!(
            "Place payout has {} numbers but {} refunds",
            numbers.len(),
            refunds.len()
        );
    }

    numbers
        .iter()
        .zip(refunds.iter())
        .filter_map(|(n, r)| {
            let number = parse_int::<u8>(n)?;
            let refund = parse_decimal(r)?;
            Some((number, refund / REFUND_SCALE))
        })
        .collect()
}

/// Place payout for a saddle number. The first listed match wins; a repeated
/// number is a data-integrity warning.
pub fn match_place_payout(horse_number: u8, payouts: &[(u8, f64)]) -> Option<f64> {
    let mut matches = payouts.iter().filter(|(n, _)| *n == horse_number);
    let first = matches.next().map(|(_, v)| *v);

    if matches.next().is_some() {
        warn!(
            horse_number,
            "Horse number listed more than once in place payouts, using first"
        );
    }

    first
}
