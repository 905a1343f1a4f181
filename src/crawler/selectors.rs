//! CSS selectors for the listing and detail views
//!
//! The class names are generated by the site and change without notice; they
//! are kept in one place so a markup change is a one-file fix.

/// Scrollable feeds; the listing feed is the one labelled with "results"
pub const FEED: &str = "div[role='feed']";

/// Result cards currently rendered in the listing feed
pub const VISIBLE_RESULTS: &str = "div[class=\"TFQHme \"]";

/// Hyperlinks inside a listing card
pub const CARD_LINK: &str = "a";

/// One row per star level of the score histogram
pub const HISTOGRAM_ROWS: &str = "tr[role='img']";

/// Tab buttons on the detail view; the reviews tab is found by its label
pub const TAB_BUTTONS: &str = "button[role=\"tab\"]";

/// Review filter bar; its parent is the scrollable review list
pub const REFINE_REVIEWS: &str = "div[aria-label=\"Refine reviews\"]";

/// Rendered review elements
pub const REVIEW_ELEMENTS: &str = "div[class=\"jftiEf fontBodyMedium \"]";

/// Expands truncated review text
pub const SEE_MORE: &str = "button[aria-label=\"See more\"]";

/// Input holding the permalink in the share panel
pub const COPY_LINK_INPUT: &str = "input[jsaction=\"pane.copyLink.clickInput\"]";

/// Closes the share panel
pub const CLOSE_BUTTON: &str = "button[aria-label=\"Close\"]";

/// Avatar image inside the author photo button
pub const AUTHOR_IMAGE: &str = "img";

/// Full-text container of a review
pub fn review_text(review_id: &str) -> String {
    format!("div[id='{}']", review_id)
}

/// Every button that belongs to a review
pub fn review_buttons(review_id: &str) -> String {
    format!("button[data-review-id=\"{}\"]", review_id)
}
