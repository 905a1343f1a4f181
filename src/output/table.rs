//! Flattened review table
//!
//! One CSV row per review, carrying its place's listing fields and histogram
//! buckets next to the review fields. Places without a histogram or without
//! reviews contribute no rows.

use crate::model::{Place, Review, Scores};
use crate::output::traits::OutputResult;
use serde::Serialize;
use std::path::Path;

/// Column names of the flattened table, in field order
pub const HEADERS: [&str; 27] = [
    "name",
    "google_id",
    "rating",
    "reviews_total",
    "location_link",
    "reviews_link",
    "reviews_id",
    "one_star",
    "two_stars",
    "three_stars",
    "four_stars",
    "five_stars",
    "review_id",
    "author_link",
    "author_title",
    "author_id",
    "author_image",
    "review_text",
    "owner_answer",
    "owner_answer_timestamp",
    "owner_answer_timestamp_datetime_utc",
    "review_link",
    "review_rating",
    "review_timestamp",
    "review_datetime_utc",
    "review_likes",
    "review_img_url",
];

/// One row of the flattened table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub name: String,
    pub google_id: String,
    pub rating: String,
    pub reviews_total: String,
    pub location_link: String,
    pub reviews_link: Option<String>,
    pub reviews_id: Option<String>,
    pub one_star: String,
    pub two_stars: String,
    pub three_stars: String,
    pub four_stars: String,
    pub five_stars: String,
    pub review_id: String,
    pub author_link: Option<String>,
    pub author_title: String,
    pub author_id: Option<String>,
    pub author_image: Option<String>,
    pub review_text: String,
    pub owner_answer: String,
    pub owner_answer_timestamp: String,
    pub owner_answer_timestamp_datetime_utc: Option<String>,
    pub review_link: Option<String>,
    pub review_rating: String,
    pub review_timestamp: String,
    pub review_datetime_utc: Option<String>,
    pub review_likes: Option<String>,
    /// Photo URLs separated by single spaces
    pub review_img_url: String,
}

impl TableRow {
    fn new(place: &Place, scores: &Scores, review: &Review) -> Self {
        Self {
            name: place.name.clone(),
            google_id: place.google_id.clone(),
            rating: place.rating.clone(),
            reviews_total: place.reviews_total.clone(),
            location_link: place.location_link.clone(),
            reviews_link: place.reviews_link.clone(),
            reviews_id: place.reviews_id.clone(),
            one_star: scores.one_star.clone(),
            two_stars: scores.two_stars.clone(),
            three_stars: scores.three_stars.clone(),
            four_stars: scores.four_stars.clone(),
            five_stars: scores.five_stars.clone(),
            review_id: review.review_id.clone(),
            author_link: review.author_link.clone(),
            author_title: review.author_title.clone(),
            author_id: review.author_id.clone(),
            author_image: review.author_image.clone(),
            review_text: review.review_text.clone(),
            owner_answer: review.owner_answer.clone(),
            owner_answer_timestamp: review.owner_answer_timestamp.clone(),
            owner_answer_timestamp_datetime_utc: review.owner_answer_timestamp_datetime_utc.clone(),
            review_link: review.review_link.clone(),
            review_rating: review.review_rating.clone(),
            review_timestamp: review.review_timestamp.clone(),
            review_datetime_utc: review.review_datetime_utc.clone(),
            review_likes: review.review_likes.clone(),
            review_img_url: review.review_img_url.join(" "),
        }
    }
}

/// Flattens places into table rows
pub fn table_rows(places: &[Place]) -> Vec<TableRow> {
    places
        .iter()
        .filter_map(|place| place.reviews_per_score.as_ref().map(|scores| (place, scores)))
        .flat_map(|(place, scores)| {
            place
                .reviews
                .iter()
                .map(move |review| TableRow::new(place, scores, review))
        })
        .collect()
}

/// Writes the flattened table to `path`, returning the number of rows
///
/// The header line is written even when there are no rows.
pub fn write_table(path: &Path, places: &[Place]) -> OutputResult<usize> {
    let rows = table_rows(places);
    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(HEADERS)?;
    }
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}
