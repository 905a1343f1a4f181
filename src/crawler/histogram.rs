//! Score histogram reader
//!
//! The detail view renders one `tr[role='img']` row per star level whose
//! `aria-label` reads like "5 stars, 1,234 reviews".

use crate::crawler::poller::Poller;
use crate::crawler::selectors;
use crate::driver::{PageDriver, Surface};
use crate::model::Scores;
use crate::Result;
use regex::Regex;
use std::sync::OnceLock;

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d)\s*\w+,\s*([\d,]+)").expect("histogram pattern is valid"))
}

/// Parses one row label into a star level and a plain count
pub fn parse_histogram_label(label: &str) -> Option<(u8, String)> {
    let caps = label_re().captures(label)?;
    let star: u8 = caps[1].parse().ok()?;
    if !(1..=5).contains(&star) {
        return None;
    }

    let count: String = caps[2].chars().filter(|c| *c != ',').collect();
    if count.is_empty() {
        return None;
    }
    Some((star, count))
}

/// Builds a histogram from row labels
///
/// Any unparseable label, or fewer than five distinct star levels, yields
/// `None`.
pub fn assemble<'a>(labels: impl IntoIterator<Item = &'a str>) -> Option<Scores> {
    let mut buckets: [Option<String>; 5] = Default::default();

    for label in labels {
        let (star, count) = parse_histogram_label(label)?;
        buckets[usize::from(star - 1)] = Some(count);
    }

    Scores::from_buckets(buckets)
}

/// Reads the histogram on a detail surface
///
/// Returns `Ok(None)` when the page has no complete histogram.
pub async fn read_histogram<D: PageDriver + ?Sized>(
    driver: &D,
    poller: &Poller<'_, D>,
    surface: Surface,
) -> Result<Option<Scores>> {
    let rows = poller
        .find_all(surface, selectors::HISTOGRAM_ROWS, None, poller.breakout())
        .await?;

    if rows.len() < 5 {
        tracing::debug!("Found {} histogram rows, need 5", rows.len());
        return Ok(None);
    }

    let mut labels = Vec::with_capacity(rows.len());
    for row in rows {
        match driver.attribute(row, "aria-label").await? {
            Some(label) => labels.push(label),
            None => return Ok(None),
        }
    }

    let scores = assemble(labels.iter().map(String::as_str));
    if scores.is_none() {
        tracing::debug!("Unparseable histogram labels: {:?}", labels);
    }
    Ok(scores)
}
