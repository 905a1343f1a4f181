use crate::model::{Review, Scores};
use serde::{Deserialize, Serialize};

/// A business discovered in the listing feed
///
/// Identity fields are filled at discovery; `reviews_link`, `reviews_id`,
/// `reviews_per_score` and `reviews` are enriched once the detail tab is crawled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub google_id: String,
    pub rating: String,
    pub reviews_total: String,
    pub location_link: String,
    #[serde(default)]
    pub reviews_link: Option<String>,
    #[serde(default)]
    pub reviews_id: Option<String>,
    #[serde(default)]
    pub reviews_per_score: Option<Scores>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Place {
    /// Creates a place with only its listing fields set
    pub fn discovered(
        name: impl Into<String>,
        google_id: impl Into<String>,
        rating: impl Into<String>,
        reviews_total: impl Into<String>,
        location_link: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            google_id: google_id.into(),
            rating: rating.into(),
            reviews_total: reviews_total.into(),
            location_link: location_link.into(),
            reviews_link: None,
            reviews_id: None,
            reviews_per_score: None,
            reviews: Vec::new(),
        }
    }

    /// Returns true if a review with `review_id` is already attached
    pub fn has_review(&self, review_id: &str) -> bool {
        self.reviews.iter().any(|r| r.review_id == review_id)
    }

    /// Attaches a review unless one with the same id is already present
    ///
    /// Returns false when the review was a duplicate.
    pub fn push_review(&mut self, review: Review) -> bool {
        if self.has_review(&review.review_id) {
            return false;
        }
        self.reviews.push(review);
        true
    }
}
