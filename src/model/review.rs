use serde::{Deserialize, Serialize};

/// One review attached to a place
///
/// `author_title`, `review_rating` and `review_timestamp` are always present; a
/// review without them is never constructed. Author, link and like fields come
/// from best-effort button scans and stay `None` when those scans find nothing.
/// Owner answer fields are empty strings when the place owner did not respond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
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
    #[serde(default)]
    pub review_img_url: Vec<String>,
}

impl Review {
    /// Creates a review from its required fields
    pub fn new(
        review_id: impl Into<String>,
        author_title: impl Into<String>,
        review_rating: impl Into<String>,
        review_timestamp: impl Into<String>,
        review_text: impl Into<String>,
    ) -> Self {
        Self {
            review_id: review_id.into(),
            author_link: None,
            author_title: author_title.into(),
            author_id: None,
            author_image: None,
            review_text: review_text.into(),
            owner_answer: String::new(),
            owner_answer_timestamp: String::new(),
            owner_answer_timestamp_datetime_utc: None,
            review_link: None,
            review_rating: review_rating.into(),
            review_timestamp: review_timestamp.into(),
            review_datetime_utc: None,
            review_likes: None,
            review_img_url: Vec::new(),
        }
    }

    pub fn has_owner_answer(&self) -> bool {
        !self.owner_answer.is_empty()
    }
}
