/// Place state definitions for tracking crawl progress
///
/// This module defines the states a place moves through between discovery in
/// the listing feed and its final outcome.
use std::fmt;

/// Represents the current state of a place in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlaceState {
    // ===== Success States =====
    /// Histogram and reviews collected, place persisted
    Completed,

    // ===== Skip States =====
    /// Detail page exposes no complete score histogram
    NoHistogram,

    /// Reviews tab never became available
    NoReviewsTab,

    // ===== Error States =====
    /// The detail crawl failed; the place is retried on the next pass or run
    Failed,
}

impl PlaceState {
    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if the place was abandoned because the page lacks a
    /// required structure
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::NoHistogram | Self::NoReviewsTab)
    }

    /// Returns true if the place's link belongs in the checkpoint
    ///
    /// Skipped places are checkpointed too: their pages will not grow the
    /// missing structure on a retry. Failed places are not, so they get retried.
    pub fn is_checkpointed(&self) -> bool {
        self.is_success() || self.is_skipped()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::NoHistogram => "no_histogram",
            Self::NoReviewsTab => "no_reviews_tab",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PlaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
