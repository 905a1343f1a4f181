//! Detail crawling of a single place
//!
//! Each place is opened in a secondary surface. The histogram is read first and
//! a place without one is abandoned. Otherwise the reviews tab is activated and
//! the review list is scrolled until it converges or hits the cap. The listing
//! feed on the primary surface is scrolled in the same loop so its own lazy
//! rendering does not stall while the detail surface is in front.

use crate::config::Config;
use crate::crawler::convergence::{Convergence, Observation};
use crate::crawler::histogram::read_histogram;
use crate::crawler::poller::Poller;
use crate::crawler::review::ReviewExtractor;
use crate::crawler::selectors;
use crate::driver::{ElementHandle, PageDriver, Surface};
use crate::model::Place;
use crate::state::PlaceState;
use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use url::Url;

/// Extracts the review list id from a reviews URL
///
/// The id is the `data=` segment of the path, up to the query string.
pub fn parse_reviews_id(reviews_link: &str) -> Option<String> {
    let url = Url::parse(reviews_link).ok()?;
    let (_, data) = url.path().split_once("data=")?;
    (!data.is_empty()).then(|| data.to_string())
}

/// Crawls places in a secondary surface next to the listing
pub struct DetailCrawler<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    config: &'a Config,
    primary: Surface,
    feed: ElementHandle,
    now: DateTime<Utc>,
}

impl<'a, D: PageDriver + ?Sized> DetailCrawler<'a, D> {
    /// Creates a detail crawler
    ///
    /// `feed` is the listing feed on `primary`, scrolled alongside the reviews;
    /// `now` anchors relative review timestamps.
    pub fn new(
        driver: &'a D,
        config: &'a Config,
        primary: Surface,
        feed: ElementHandle,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            driver,
            config,
            primary,
            feed,
            now,
        }
    }

    /// Enriches `place` from its detail view
    ///
    /// Returns the terminal state of the place. The secondary surface is closed
    /// and the primary surface made current again whatever the outcome.
    pub async fn crawl(&self, place: &mut Place) -> Result<PlaceState> {
        tracing::info!("Opening {}", place.name);
        let surface = self.driver.open_surface(&place.location_link).await?;
        tokio::time::sleep(self.config.crawl.detail_settle()).await;

        let outcome = self.crawl_surface(surface, place).await;

        let closed = self.driver.close_surface(surface).await;
        let switched = self.driver.switch_surface(self.primary).await;

        let state = outcome?;
        closed?;
        switched?;
        Ok(state)
    }

    async fn crawl_surface(&self, surface: Surface, place: &mut Place) -> Result<PlaceState> {
        let poller = Poller::new(self.driver, &self.config.poll);

        let Some(scores) = read_histogram(self.driver, &poller, surface).await? else {
            tracing::warn!("{} has no score histogram, skipping", place.name);
            return Ok(PlaceState::NoHistogram);
        };
        place.reviews_per_score = Some(scores);

        if !self.activate_reviews_tab(&poller, surface).await? {
            tracing::warn!("{} has no reviews tab, skipping", place.name);
            return Ok(PlaceState::NoReviewsTab);
        }

        let reviews_link = self.driver.current_url(surface).await?;
        place.reviews_id = parse_reviews_id(&reviews_link);
        if place.reviews_id.is_none() {
            tracing::debug!("No review list id in {}", reviews_link);
        }
        place.reviews_link = Some(reviews_link);

        let refine = poller
            .require(surface, selectors::REFINE_REVIEWS, None, poller.patient())
            .await?;
        let container = self.driver.parent(refine).await?.ok_or_else(|| {
            HarvestError::Structural("review filter bar has no parent".to_string())
        })?;

        self.collect_reviews(&poller, surface, container, place).await?;

        tracing::info!("{}: {} reviews", place.name, place.reviews.len());
        Ok(PlaceState::Completed)
    }

    /// Hovers and clicks the tab labelled "reviews"
    ///
    /// Returns false if no attempt found and clicked it.
    async fn activate_reviews_tab(&self, poller: &Poller<'_, D>, surface: Surface) -> Result<bool> {
        let interaction = &self.config.interaction;

        for attempt in 1..=interaction.max_attempts {
            let tabs = poller
                .find_all(surface, selectors::TAB_BUTTONS, None, poller.breakout())
                .await?;

            for tab in tabs {
                let label = self.driver.attribute(tab, "aria-label").await?;
                if !label.is_some_and(|l| l.to_lowercase().contains("reviews")) {
                    continue;
                }

                let activated = match self.driver.hover(tab).await {
                    Ok(()) => self.driver.click(tab).await,
                    Err(e) => Err(e),
                };

                match activated {
                    Ok(()) => {
                        tokio::time::sleep(interaction.click_settle()).await;
                        return Ok(true);
                    }
                    Err(e) if e.is_transient() => {
                        tracing::debug!("Reviews tab click failed (attempt {}): {}", attempt, e);
                    }
                    Err(e) => return Err(e.into()),
                }
                break;
            }

            tokio::time::sleep(interaction.click_settle()).await;
        }

        Ok(false)
    }

    /// Scrolls the review list until it converges, extracting new elements
    async fn collect_reviews(
        &self,
        poller: &Poller<'_, D>,
        surface: Surface,
        container: ElementHandle,
        place: &mut Place,
    ) -> Result<()> {
        let crawl = &self.config.crawl;
        let extractor = ReviewExtractor::new(
            self.driver,
            *poller,
            &self.config.interaction,
            surface,
            self.now,
        );
        let mut convergence = Convergence::new(crawl.stall_limit, Some(crawl.review_cap));
        let mut seen: HashSet<ElementHandle> = HashSet::new();

        loop {
            self.driver.scroll_to_end(container).await?;
            tokio::time::sleep(crawl.scroll_settle()).await;

            self.driver.switch_surface(self.primary).await?;
            self.driver.scroll_to_end(self.feed).await?;
            tokio::time::sleep(crawl.scroll_settle()).await;
            self.driver.switch_surface(surface).await?;

            let elements = poller
                .find_all(surface, selectors::REVIEW_ELEMENTS, None, poller.breakout())
                .await?;

            let observation = convergence.observe(elements.len());
            let limit = match observation {
                Observation::Stalled => {
                    tokio::time::sleep(crawl.scroll_settle()).await;
                    continue;
                }
                Observation::Converged => break,
                Observation::Grew => elements.len(),
                Observation::Capped => crawl.review_cap,
            };

            for &element in elements.iter().take(limit) {
                if !seen.insert(element) {
                    continue;
                }

                match extractor.extract(element).await {
                    Ok(Some(review)) => {
                        if !place.push_review(review) {
                            tracing::debug!("Duplicate review id in {}", place.name);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Failed to extract a review of {}: {}", place.name, e),
                }
            }

            if observation == Observation::Capped {
                tracing::info!("{}: review cap of {} reached", place.name, crawl.review_cap);
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BrowserConfig, CrawlConfig, InteractionConfig, OutputConfig, PollConfig};
    use crate::driver::SnapshotDriver;

    const LISTING: &str = "https://maps.test/search";
    const SOL: &str = "https://maps.test/place/sol";

    fn create_test_config(review_cap: usize) -> Config {
        Config {
            browser: BrowserConfig::default(),
            crawl: CrawlConfig {
                start_url: LISTING.to_string(),
                page_settle_ms: 0,
                detail_settle_ms: 0,
                scroll_settle_ms: 0,
                stall_limit: 3,
                review_cap,
            },
            poll: PollConfig {
                attempt_wait_ms: 0,
                retry_interval_ms: 0,
                breakout_retries: 0,
                timeout_ms: 0,
            },
            interaction: InteractionConfig {
                max_attempts: 1,
                click_settle_ms: 0,
                copy_link_timeout_ms: 0,
            },
            output: OutputConfig {
                json_path: "data.json".to_string(),
                csv_path: "data.csv".to_string(),
                checkpoint_path: "crawled.txt".to_string(),
            },
        }
    }

    fn review(id: &str, author: &str) -> String {
        format!(
            r#"<div class="jftiEf fontBodyMedium " data-review-id="{id}">
                <div>{author}</div><div>3 reviews</div><div>4/5</div><div>a week ago</div>
                <div id="{id}">Fine</div>
            </div>"#
        )
    }

    fn sol_driver() -> SnapshotDriver {
        let listing = format!(
            r#"<html><body><div role="feed" aria-label="Results for hotels">
                <div><a aria-label="Hotel Sol" href="{SOL}"></a></div>
            </div></body></html>"#
        );
        let rows: String = (1..=5)
            .map(|star| format!(r#"<tr role="img" aria-label="{} stars, 1 review"><td></td></tr>"#, star))
            .collect();
        let reviews: String = [("r1", "Ana"), ("r2", "Luis"), ("r3", "Marta")]
            .iter()
            .map(|(id, author)| review(id, author))
            .collect();
        let detail = format!(
            r#"<html><body>
                <table>{rows}</table>
                <button role="tab" aria-label="Reviews"></button>
                <div><div aria-label="Refine reviews"></div>{reviews}</div>
            </body></html>"#
        );

        SnapshotDriver::new()
            .with_page(LISTING, listing)
            .with_page(SOL, detail)
    }

    async fn crawl_sol(driver: &SnapshotDriver, config: &Config) -> (PlaceState, Place) {
        let primary = driver.open_surface(LISTING).await.unwrap();
        let feed = driver.query(primary, selectors::FEED, None).await.unwrap()[0];
        let now = Utc::now();

        let crawler = DetailCrawler::new(driver, config, primary, feed, now);
        let mut place = Place::discovered("Hotel Sol", "0x1:0xa", "4.5", "3", SOL);
        let state = crawler.crawl(&mut place).await.unwrap();
        (state, place)
    }

    #[tokio::test]
    async fn test_review_cap_cuts_feed_short() {
        let driver = sol_driver();
        let config = create_test_config(2);

        let (state, place) = crawl_sol(&driver, &config).await;

        assert_eq!(state, PlaceState::Completed);
        let ids: Vec<_> = place.reviews.iter().map(|r| r.review_id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
        // One pass: the review list and the listing feed, no stalled rounds
        assert_eq!(driver.scroll_count(), 2);
        assert_eq!(driver.open_surfaces().len(), 1);
    }

    #[tokio::test]
    async fn test_uncapped_reviews_run_until_converged() {
        let driver = sol_driver();
        let config = create_test_config(200);

        let (state, place) = crawl_sol(&driver, &config).await;

        assert_eq!(state, PlaceState::Completed);
        assert_eq!(place.reviews.len(), 3);
        // One growing pass plus three stalled ones, two scrolls each
        assert_eq!(driver.scroll_count(), 8);
    }

    #[test]
    fn test_reviews_id() {
        assert_eq!(
            parse_reviews_id(
                "https://www.google.com/maps/place/Hotel+Sol/@40.4,-3.7,17z/data=!4m8!3m7!1s0x1:0xa!9m1!1b1?entry=ttu"
            )
            .as_deref(),
            Some("!4m8!3m7!1s0x1:0xa!9m1!1b1")
        );
        assert_eq!(
            parse_reviews_id("https://maps.test/place/sol/data=!9m1").as_deref(),
            Some("!9m1")
        );
    }

    #[test]
    fn test_reviews_id_missing() {
        assert!(parse_reviews_id("https://maps.test/place/sol?hl=en").is_none());
        assert!(parse_reviews_id("https://maps.test/place/sol/data=").is_none());
        assert!(parse_reviews_id("not a url").is_none());
    }
}
