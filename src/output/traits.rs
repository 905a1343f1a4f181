//! Output sink trait and types
//!
//! This module defines the trait the coordinator persists through and the
//! summary it reports when a crawl ends.

use crate::model::Place;
use crate::state::PlaceState;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Summary of one crawl run
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    /// Outer loop iterations that discovered places
    pub iterations: u64,

    /// Places reaching each terminal state during this run
    pub places_by_state: BTreeMap<PlaceState, u64>,

    /// Reviews attached to places completed during this run
    pub reviews_collected: u64,

    pub duration_seconds: u64,
}

impl CrawlSummary {
    /// Creates a new empty crawl summary
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, state: PlaceState) {
        *self.places_by_state.entry(state).or_insert(0) += 1;
    }

    pub fn count(&self, state: PlaceState) -> u64 {
        self.places_by_state.get(&state).copied().unwrap_or(0)
    }

    /// Returns the number of place visits recorded, failures included
    pub fn total_places(&self) -> u64 {
        self.places_by_state.values().sum()
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.total_places();
        if total == 0 {
            return 0.0;
        }
        (self.count(PlaceState::Completed) as f64 / total as f64) * 100.0
    }
}

/// Trait for result sinks
///
/// The coordinator hands over the full result set after every completed place;
/// implementations overwrite what they wrote before.
pub trait OutputSink: Send {
    fn persist(&self, places: &[Place]) -> OutputResult<()>;
}
