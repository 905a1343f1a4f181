//! Review extraction
//!
//! Turns one rendered review element into a [`Review`]. The element text gives
//! the author, rating and relative time; the buttons scoped to the review id
//! give the optional author, permalink, like and photo fields.

use crate::config::InteractionConfig;
use crate::crawler::buttons::{classify, parse_author_id, ButtonAttrs, ButtonKind};
use crate::crawler::poller::Poller;
use crate::crawler::selectors;
use crate::driver::{ElementHandle, PageDriver, Surface};
use crate::model::{format_relative, Review};
use crate::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Author, rating and relative time parsed from a review's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingSlugs {
    pub author: String,
    pub rating: String,
    pub posted: String,
}

/// Owner response attached to a review
///
/// Both fields are empty when the owner did not respond.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerResponse {
    pub timestamp: String,
    pub answer: String,
}

fn rating_slugs_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)([\w\s'\-]+)\n.*?(\d+)\s*reviews?.*?\n(\d{1,2})/(\d{1,2})\n([\w\s]+?ago)")
            .expect("rating pattern is valid")
    })
}

fn owner_response_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)Response\s+from\s+the\s+owner\s*([\w\s]+?ago)\s(.+)")
            .expect("owner response pattern is valid")
    })
}

/// Parses author, rating and relative time out of a review's full text
///
/// Expects, in order: the author line, a review-count clause, an `N/M` rating
/// line and a trailing "... ago" phrase. The rating is the numerator and must
/// be a star level from 1 to 5.
pub fn parse_rating_slugs(text: &str) -> Option<RatingSlugs> {
    let caps = rating_slugs_re().captures(text)?;

    let author = caps[1].trim();
    if author.is_empty() {
        return None;
    }

    let rating: u8 = caps[3].parse().ok()?;
    if !(1..=5).contains(&rating) {
        return None;
    }

    Some(RatingSlugs {
        author: author.to_string(),
        rating: rating.to_string(),
        posted: caps[5].trim().to_string(),
    })
}

/// Parses the owner response out of a review's full text
pub fn parse_owner_response(text: &str) -> OwnerResponse {
    match owner_response_re().captures(text) {
        Some(caps) => OwnerResponse {
            timestamp: caps[1].trim().to_string(),
            answer: caps[2].trim().to_string(),
        },
        None => OwnerResponse::default(),
    }
}

/// Extracts reviews from elements on one detail surface
pub struct ReviewExtractor<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    poller: Poller<'a, D>,
    interaction: &'a InteractionConfig,
    surface: Surface,
    now: DateTime<Utc>,
}

impl<'a, D: PageDriver + ?Sized> ReviewExtractor<'a, D> {
    /// Creates an extractor; `now` anchors relative timestamps
    pub fn new(
        driver: &'a D,
        poller: Poller<'a, D>,
        interaction: &'a InteractionConfig,
        surface: Surface,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            driver,
            poller,
            interaction,
            surface,
            now,
        }
    }

    /// Extracts one review
    ///
    /// Returns `Ok(None)` when the element carries no review id or its text has
    /// no parseable author/rating/time triple.
    pub async fn extract(&self, element: ElementHandle) -> Result<Option<Review>> {
        self.driver.scroll_into_view(element).await?;

        let review_id = match self.driver.attribute(element, "data-review-id").await? {
            Some(id) if !id.is_empty() => id,
            _ => {
                tracing::warn!("Review element without a review id, skipping");
                return Ok(None);
            }
        };

        let review_text = self.review_text(element, &review_id).await?;

        let full_text = self.driver.text(element).await?;
        let slugs = match parse_rating_slugs(&full_text) {
            Some(slugs) => slugs,
            None => {
                tracing::warn!("Review {} has no author/rating/time, skipping", review_id);
                tracing::debug!("Unparsed review text: {:?}", full_text);
                return Ok(None);
            }
        };

        let mut review = Review::new(
            review_id.as_str(),
            slugs.author,
            slugs.rating,
            slugs.posted,
            review_text,
        );
        review.review_datetime_utc = format_relative(&review.review_timestamp, self.now);

        self.scan_buttons(element, &mut review).await?;

        let owner = parse_owner_response(&full_text);
        if !owner.timestamp.is_empty() {
            review.owner_answer_timestamp_datetime_utc = format_relative(&owner.timestamp, self.now);
        }
        review.owner_answer = owner.answer;
        review.owner_answer_timestamp = owner.timestamp;

        tracing::debug!("Extracted review {} by {}", review.review_id, review.author_title);
        Ok(Some(review))
    }

    /// Reads the full review text, expanding it first if it is truncated
    async fn review_text(&self, element: ElementHandle, review_id: &str) -> Result<String> {
        let container = match self
            .poller
            .find_one(
                self.surface,
                &selectors::review_text(review_id),
                Some(element),
                self.poller.breakout(),
            )
            .await?
        {
            Some(container) => container,
            None => return Ok(String::new()),
        };

        let see_more = self
            .poller
            .find_one(
                self.surface,
                selectors::SEE_MORE,
                Some(container),
                self.poller.breakout(),
            )
            .await?;
        if let Some(button) = see_more {
            match self.driver.click(button).await {
                Ok(()) => tokio::time::sleep(self.interaction.click_settle()).await,
                Err(e) => tracing::debug!("Expanding review {} failed: {}", review_id, e),
            }
        }

        Ok(self.driver.text(container).await?)
    }

    /// Fills the optional fields from the buttons scoped to the review
    ///
    /// A button that cannot be read is skipped; the review keeps whatever the
    /// other buttons provided.
    async fn scan_buttons(&self, element: ElementHandle, review: &mut Review) -> Result<()> {
        let buttons = self
            .poller
            .find_all(
                self.surface,
                &selectors::review_buttons(&review.review_id),
                Some(element),
                self.poller.breakout(),
            )
            .await?;

        for button in buttons {
            let attrs = match self.button_attrs(button).await {
                Ok(attrs) => attrs,
                Err(e) => {
                    tracing::warn!("Skipping a button of review {}: {}", review.review_id, e);
                    continue;
                }
            };

            match classify(&attrs) {
                ButtonKind::AuthorPhoto { link } => {
                    review.author_id = parse_author_id(&link);
                    review.author_image = match self.author_image(button).await {
                        Ok(image) => image,
                        Err(e) => {
                            tracing::debug!("No avatar for review {}: {}", review.review_id, e);
                            None
                        }
                    };
                    review.author_link = Some(link);
                }
                ButtonKind::Share => {
                    if let Some(link) = self.share_link(button).await {
                        review.review_link = Some(link);
                    }
                }
                ButtonKind::Likes(likes) => review.review_likes = Some(likes),
                ButtonKind::Photo(url) => review.review_img_url.push(url),
                ButtonKind::Unknown => {}
            }
        }

        Ok(())
    }

    async fn button_attrs(&self, button: ElementHandle) -> Result<ButtonAttrs> {
        Ok(ButtonAttrs {
            aria_label: self.driver.attribute(button, "aria-label").await?,
            title: self.driver.attribute(button, "title").await?,
            data_href: self.driver.attribute(button, "data-href").await?,
            photo_index: self.driver.attribute(button, "data-photo-index").await?,
            style: self.driver.attribute(button, "style").await?,
        })
    }

    async fn author_image(&self, button: ElementHandle) -> Result<Option<String>> {
        let image = self
            .poller
            .find_one(
                self.surface,
                selectors::AUTHOR_IMAGE,
                Some(button),
                self.poller.breakout(),
            )
            .await?;

        match image {
            Some(image) => Ok(self.driver.attribute(image, "src").await?),
            None => Ok(None),
        }
    }

    /// Captures the review permalink through the share panel
    ///
    /// Gives up after `max-attempts` tries; the review is kept without a link.
    async fn share_link(&self, button: ElementHandle) -> Option<String> {
        for attempt in 1..=self.interaction.max_attempts {
            match self.try_share_link(button).await {
                Ok(Some(link)) => return Some(link),
                Ok(None) => {
                    tracing::debug!("Share panel gave no link (attempt {})", attempt);
                }
                Err(e) => {
                    tracing::debug!("Share link attempt {} failed: {}", attempt, e);
                }
            }
        }

        tracing::warn!(
            "No permalink after {} attempts, keeping review without one",
            self.interaction.max_attempts
        );
        None
    }

    async fn try_share_link(&self, button: ElementHandle) -> Result<Option<String>> {
        self.driver.scroll_into_view(button).await?;
        self.driver.hover(button).await?;
        self.driver.click(button).await?;
        tokio::time::sleep(self.interaction.click_settle()).await;

        let input = self
            .poller
            .require(
                self.surface,
                selectors::COPY_LINK_INPUT,
                None,
                self.poller.breakout(),
            )
            .await?;
        let link = self
            .poller
            .attribute_value(input, "value", self.interaction.copy_link_timeout())
            .await?;

        let close = self
            .poller
            .require(
                self.surface,
                selectors::CLOSE_BUTTON,
                None,
                self.poller.breakout(),
            )
            .await?;
        self.driver.click(close).await?;
        tokio::time::sleep(self.interaction.click_settle()).await;

        Ok(link)
    }
}
