//! Listing feed discovery
//!
//! The listing feed renders a header block, a `role="presentation"` sentinel
//! and then one unclassed card per business. Cards are parsed into
//! [`Place`]s carrying only their listing fields.

use crate::crawler::poller::Poller;
use crate::crawler::selectors;
use crate::driver::{ElementHandle, PageDriver, Surface};
use crate::model::Place;
use crate::state::CrawlState;
use crate::{HarvestError, Result};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Name, rating and review count parsed from a card's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCard {
    pub name: String,
    pub rating: String,
    /// Review count without digit grouping
    pub reviews_total: String,
}

fn card_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)(.+?)\n(\d+\.?\d?)\s*\(([\d,]+)").expect("card pattern is valid")
    })
}

fn google_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)metadata:(.+)").expect("metadata pattern is valid"))
}

/// Parses name, rating and review count from a card's text
pub fn parse_listing_card(text: &str) -> Option<ListingCard> {
    let caps = card_re().captures(text)?;
    let name = caps[1].trim();
    if name.is_empty() {
        return None;
    }

    Some(ListingCard {
        name: name.to_string(),
        rating: caps[2].to_string(),
        reviews_total: caps[3].replace(',', ""),
    })
}

/// Extracts the stable place id from a link's `jslog` attribute
pub fn parse_google_id(jslog: &str) -> Option<String> {
    let id = google_id_re().captures(jslog)?[1].trim().to_string();
    (!id.is_empty()).then_some(id)
}

/// Returns true if a link's accessible label names the card's business
pub fn label_matches(label: &str, name: &str) -> bool {
    label.to_lowercase().contains(&name.to_lowercase())
}

/// Discovers places in the listing feed of the primary surface
pub struct ListCrawler<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    poller: Poller<'a, D>,
    surface: Surface,
}

impl<'a, D: PageDriver + ?Sized> ListCrawler<'a, D> {
    pub fn new(driver: &'a D, poller: Poller<'a, D>, surface: Surface) -> Self {
        Self {
            driver,
            poller,
            surface,
        }
    }

    /// Locates the results feed
    ///
    /// Prefers the feed labelled with "results"; falls back to the first feed.
    pub async fn find_feed(&self) -> Result<ElementHandle> {
        let feeds = self
            .poller
            .find_all(self.surface, selectors::FEED, None, self.poller.patient())
            .await?;

        for &feed in &feeds {
            let label = self.driver.attribute(feed, "aria-label").await?;
            if label.is_some_and(|l| l.to_lowercase().contains("results")) {
                return Ok(feed);
            }
        }

        feeds
            .first()
            .copied()
            .ok_or_else(|| HarvestError::Structural("listing has no results feed".to_string()))
    }

    /// Number of result cards currently rendered
    pub async fn visible_count(&self) -> Result<usize> {
        let visible = self
            .poller
            .find_all(
                self.surface,
                selectors::VISIBLE_RESULTS,
                None,
                self.poller.breakout(),
            )
            .await?;
        Ok(visible.len())
    }

    /// Returns the business cards in the feed
    ///
    /// Skips everything up to and including the presentation sentinel, then
    /// keeps siblings that carry no class.
    pub async fn cards(&self, feed: ElementHandle) -> Result<Vec<ElementHandle>> {
        let mut cards = Vec::new();
        let mut after_sentinel = false;

        for child in self.driver.children(feed).await? {
            if after_sentinel {
                let class = self.driver.attribute(child, "class").await?;
                if class.map_or(true, |c| c.trim().is_empty()) {
                    cards.push(child);
                }
            }

            if self.driver.attribute(child, "role").await?.as_deref() == Some("presentation") {
                after_sentinel = true;
            }
        }

        Ok(cards)
    }

    /// Parses every card and drops places already in `state`
    ///
    /// Cards that cannot be parsed or resolved to a link are skipped.
    pub async fn discover(&self, feed: ElementHandle, state: &CrawlState) -> Result<Vec<Place>> {
        let cards = self.cards(feed).await?;
        let mut seen = HashSet::new();
        let mut places = Vec::new();

        for card in &cards {
            let place = match self.parse_card(*card).await {
                Ok(Some(place)) => place,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Failed to read listing card: {}", e);
                    continue;
                }
            };

            if state.contains(&place.location_link) {
                tracing::debug!("Already crawled: {}", place.name);
                continue;
            }
            if !seen.insert(place.location_link.clone()) {
                continue;
            }

            places.push(place);
        }

        tracing::info!(
            "Discovered {} new places among {} cards",
            places.len(),
            cards.len()
        );
        Ok(places)
    }

    async fn parse_card(&self, card: ElementHandle) -> Result<Option<Place>> {
        let text = self.driver.text(card).await?;
        let listing = match parse_listing_card(&text) {
            Some(listing) => listing,
            None => {
                tracing::debug!("Card without name/rating/count: {:?}", text);
                return Ok(None);
            }
        };

        let links = self
            .driver
            .query(self.surface, selectors::CARD_LINK, Some(card))
            .await?;

        let mut place_link = None;
        for link in links {
            let label = self.driver.attribute(link, "aria-label").await?;
            if label.is_some_and(|l| label_matches(&l, &listing.name)) {
                place_link = Some(link);
                break;
            }
        }

        let Some(link) = place_link else {
            tracing::warn!("No link labelled '{}' in its card", listing.name);
            return Ok(None);
        };

        let Some(location_link) = self.driver.attribute(link, "href").await? else {
            tracing::warn!("Link for '{}' has no href", listing.name);
            return Ok(None);
        };

        let google_id = self
            .driver
            .attribute(link, "jslog")
            .await?
            .as_deref()
            .and_then(parse_google_id);
        let Some(google_id) = google_id else {
            tracing::warn!("Link for '{}' carries no place id", listing.name);
            return Ok(None);
        };

        Ok(Some(Place::discovered(
            listing.name,
            google_id,
            listing.rating,
            listing.reviews_total,
            location_link,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollConfig;
    use crate::driver::SnapshotDriver;

    #[test]
    fn test_parse_card() {
        let card = parse_listing_card("Hotel Sol\n4.5(1,234)\nHotel · Calle Mayor 1\n").unwrap();
        assert_eq!(card.name, "Hotel Sol");
        assert_eq!(card.rating, "4.5");
        assert_eq!(card.reviews_total, "1234");

        let whole = parse_listing_card("Casa Pepe\n4 (87)").unwrap();
        assert_eq!(whole.rating, "4");
        assert_eq!(whole.reviews_total, "87");
    }

    #[test]
    fn test_parse_card_without_rating() {
        assert!(parse_listing_card("Sponsored\nNo reviews").is_none());
        assert!(parse_listing_card("").is_none());
    }

    #[test]
    fn test_google_id() {
        assert_eq!(
            parse_google_id("track:click;metadata:0x12:0x34").as_deref(),
            Some("0x12:0x34")
        );
        assert!(parse_google_id("track:click").is_none());
    }

    #[test]
    fn test_label_matches_plain_text() {
        assert!(label_matches("Hotel (Sol) & Spa", "hotel (sol)"));
        assert!(!label_matches("Hotel Luna", "Hotel Sol"));
    }

    const LISTING: &str = "https://maps.test/search";

    fn listing() -> String {
        r#"<html><body>
            <div role="feed" aria-label="Filters"></div>
            <div role="feed" aria-label="Results for hotels">
                <div class="header">Results</div>
                <div role="presentation"></div>
                <div class="TFQHme "></div>
                <div>
                    <a aria-label="Hotel Sol" href="https://maps.test/place/sol"
                       jslog="track:click;metadata:0x1:0xa"></a>
                    <div>Hotel Sol</div><div>4.5(1,234)</div>
                </div>
                <div class="TFQHme "></div>
                <div>
                    <a aria-label="Visit website" href="https://sol.test"></a>
                    <a aria-label="Casa Pepe" href="https://maps.test/place/pepe"
                       jslog="metadata:0x2:0xb"></a>
                    <div>Casa Pepe</div><div>4.1 (87)</div>
                </div>
                <div class="">
                    <a aria-label="Hostal Luna" href="https://maps.test/place/luna"
                       jslog="metadata:0x3:0xc"></a>
                    <div>Hostal Luna</div><div>3.9(12)</div>
                </div>
                <div>
                    <div>Ad without rating</div>
                </div>
            </div>
        </body></html>"#
            .to_string()
    }

    fn zero_poll() -> PollConfig {
        PollConfig {
            attempt_wait_ms: 0,
            retry_interval_ms: 0,
            breakout_retries: 0,
            timeout_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_discover_skips_sentinel_and_crawled() {
        let driver = SnapshotDriver::new().with_page(LISTING, listing());
        let poll = zero_poll();
        let surface = driver.open_surface(LISTING).await.unwrap();
        let crawler = ListCrawler::new(&driver, Poller::new(&driver, &poll), surface);

        let feed = crawler.find_feed().await.unwrap();
        assert_eq!(
            driver.attribute(feed, "aria-label").await.unwrap().as_deref(),
            Some("Results for hotels")
        );
        assert_eq!(crawler.visible_count().await.unwrap(), 2);

        let mut state = CrawlState::in_memory();
        state.record("https://maps.test/place/pepe").unwrap();

        let places = crawler.discover(feed, &state).await.unwrap();
        let names: Vec<_> = places.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Hotel Sol", "Hostal Luna"]);

        let sol = &places[0];
        assert_eq!(sol.google_id, "0x1:0xa");
        assert_eq!(sol.rating, "4.5");
        assert_eq!(sol.reviews_total, "1234");
        assert_eq!(sol.location_link, "https://maps.test/place/sol");
        assert!(sol.reviews_per_score.is_none());
    }
}
