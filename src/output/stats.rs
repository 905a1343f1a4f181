//! Statistics over a harvested result set
//!
//! This module computes and prints statistics from the JSON result set and the
//! checkpoint, and prints the summary of a finished crawl run.

use crate::model::Place;
use crate::output::json::load_places;
use crate::output::traits::{CrawlSummary, OutputResult};
use crate::state::{CrawlState, PlaceState};
use std::path::Path;

/// Result set statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    /// Places in the result set
    pub total_places: u64,

    /// Places carrying a complete histogram
    pub places_with_histogram: u64,

    /// Links in the checkpoint, including skipped places
    pub checkpointed: u64,

    pub total_reviews: u64,

    /// Reviews with a response from the owner
    pub owner_answers: u64,

    /// Reviews with at least one photo
    pub reviews_with_photos: u64,

    /// Photos across all reviews
    pub total_photos: u64,

    /// Mean of the review ratings that parse as numbers
    pub mean_review_rating: Option<f64>,
}

impl CrawlStatistics {
    /// Computes statistics from places in memory
    pub fn from_places(places: &[Place]) -> Self {
        let mut stats = Self {
            total_places: places.len() as u64,
            ..Self::default()
        };

        let mut rating_sum = 0.0;
        let mut rated = 0u64;

        for place in places {
            if place.reviews_per_score.is_some() {
                stats.places_with_histogram += 1;
            }

            for review in &place.reviews {
                stats.total_reviews += 1;
                if review.has_owner_answer() {
                    stats.owner_answers += 1;
                }
                if !review.review_img_url.is_empty() {
                    stats.reviews_with_photos += 1;
                    stats.total_photos += review.review_img_url.len() as u64;
                }
                if let Ok(rating) = review.review_rating.parse::<f64>() {
                    rating_sum += rating;
                    rated += 1;
                }
            }
        }

        if rated > 0 {
            stats.mean_review_rating = Some(rating_sum / rated as f64);
        }
        stats
    }
}

/// Loads statistics from the result set and checkpoint files
pub fn load_statistics(json_path: &Path, checkpoint_path: &Path) -> OutputResult<CrawlStatistics> {
    let places = load_places(json_path)?;
    let checkpoint = CrawlState::load(checkpoint_path)?;

    let mut stats = CrawlStatistics::from_places(&places);
    stats.checkpointed = checkpoint.len() as u64;
    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Places:");
    println!("  In result set: {}", stats.total_places);
    println!("  With histogram: {}", stats.places_with_histogram);
    println!("  Checkpointed: {}", stats.checkpointed);
    println!();

    println!("Reviews:");
    println!("  Total: {}", stats.total_reviews);
    println!("  With owner response: {}", stats.owner_answers);
    println!(
        "  With photos: {} ({} photos)",
        stats.reviews_with_photos, stats.total_photos
    );
    match stats.mean_review_rating {
        Some(mean) => println!("  Mean rating: {:.2}", mean),
        None => println!("  Mean rating: n/a"),
    }

    if stats.total_places > 0 {
        println!(
            "  Per place: {:.1}",
            stats.total_reviews as f64 / stats.total_places as f64
        );
    }
}

/// Prints the summary of a finished crawl run
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");
    println!("Iterations: {}", summary.iterations);
    println!("Duration: {}s", summary.duration_seconds);
    println!();

    println!("Places by State:");
    for (state, count) in &summary.places_by_state {
        println!("  {}: {}", state, count);
    }
    println!();

    println!("Reviews collected: {}", summary.reviews_collected);
    println!(
        "Success Rate: {:.1}% ({} / {} places completed)",
        summary.success_rate(),
        summary.count(PlaceState::Completed),
        summary.total_places()
    );
}
