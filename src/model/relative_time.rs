//! Resolution of relative "time ago" phrases
//!
//! Review timestamps are rendered as phrases such as "2 weeks ago" or
//! "a month ago". They are resolved against the crawl clock to an absolute UTC
//! time. Months count as 30 days and years as 365 days.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Output format for absolute timestamps
pub const DATETIME_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

fn phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:edited\s+)?(a|an|one|\d+)\s+(second|minute|hour|day|week|month|year)s?\s+ago$")
            .expect("relative time pattern is valid")
    })
}

/// Resolves a relative phrase against `now`
///
/// Returns `None` for phrases that are not understood.
pub fn resolve_relative(phrase: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let phrase = phrase.trim();
    if phrase.eq_ignore_ascii_case("just now") {
        return Some(now);
    }

    let caps = phrase_re().captures(phrase)?;
    let amount: i64 = match caps[1].to_ascii_lowercase().as_str() {
        "a" | "an" | "one" => 1,
        digits => digits.parse().ok()?,
    };

    let unit = match caps[2].to_ascii_lowercase().as_str() {
        "second" => Duration::seconds(1),
        "minute" => Duration::minutes(1),
        "hour" => Duration::hours(1),
        "day" => Duration::days(1),
        "week" => Duration::weeks(1),
        "month" => Duration::days(30),
        _ => Duration::days(365),
    };

    now.checked_sub_signed(unit * i32::try_from(amount).ok()?)
}

/// Resolves a relative phrase and formats it with [`DATETIME_FORMAT`]
pub fn format_relative(phrase: &str, now: DateTime<Utc>) -> Option<String> {
    resolve_relative(phrase, now).map(|dt| dt.format(DATETIME_FORMAT).to_string())
}
