//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the outer crawl loop that coordinates:
//! - Loading the checkpoint and any previous result set
//! - Scrolling the listing feed until it converges
//! - Discovering new places and crawling each one in a detail surface
//! - Persisting the result set and checkpointing after every place

use crate::config::Config;
use crate::crawler::convergence::{Convergence, Observation};
use crate::crawler::detail::DetailCrawler;
use crate::crawler::listing::ListCrawler;
use crate::crawler::poller::Poller;
use crate::driver::{ChromeDriver, ElementHandle, PageDriver, Surface};
use crate::model::Place;
use crate::output::{load_places, CrawlSummary, FileOutput, OutputSink};
use crate::state::{CrawlState, PlaceState};
use crate::Result;
use chrono::Utc;
use std::path::Path;
use std::time::Instant;

/// Main crawler coordinator structure
///
/// Owns the driver, the checkpoint and the result set. Nothing else mutates
/// them, and they are only written after a place reaches a terminal state.
pub struct Coordinator<D: PageDriver> {
    config: Config,
    driver: D,
    state: CrawlState,
    places: Vec<Place>,
    sink: Box<dyn OutputSink>,
}

impl<D: PageDriver> Coordinator<D> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `driver` - The page driver to crawl with
    /// * `fresh` - Whether to truncate the checkpoint and start a new result set
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - Failed to load the checkpoint or result set
    pub fn new(config: Config, driver: D, fresh: bool) -> Result<Self> {
        let checkpoint_path = Path::new(&config.output.checkpoint_path);

        let (state, places) = if fresh {
            tracing::info!("Starting fresh, truncating {}", checkpoint_path.display());
            (CrawlState::fresh(checkpoint_path)?, Vec::new())
        } else {
            let state = CrawlState::load(checkpoint_path)?;
            let places = load_places(Path::new(&config.output.json_path))?;
            tracing::info!(
                "Resuming with {} checkpointed links and {} stored places",
                state.len(),
                places.len()
            );
            (state, places)
        };

        let sink = Box::new(FileOutput::new(&config.output));

        Ok(Self {
            config,
            driver,
            state,
            places,
            sink,
        })
    }

    /// Replaces the output sink
    pub fn with_sink(mut self, sink: Box<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Runs the main crawl loop
    ///
    /// 1. Opens the listing on the primary surface
    /// 2. Scrolls the feed and observes the number of visible results
    /// 3. On every pass that has not converged, discovers new places and
    ///    crawls each one
    /// 4. Stops once the feed stalled `stall-limit` times in a row
    pub async fn run(&mut self) -> Result<CrawlSummary> {
        let started = Instant::now();
        let mut summary = CrawlSummary::new();

        let Self {
            config,
            driver,
            state,
            places,
            sink,
        } = self;
        let driver: &D = driver;
        let config: &Config = config;

        tracing::info!("Opening listing {}", config.crawl.start_url);
        let primary = driver.open_surface(&config.crawl.start_url).await?;
        tokio::time::sleep(config.crawl.page_settle()).await;

        let list = ListCrawler::new(driver, Poller::new(driver, &config.poll), primary);
        let feed = list.find_feed().await?;
        let mut convergence = Convergence::new(config.crawl.stall_limit, None);
        let mut visible = 0;

        loop {
            if let Err(e) = driver.scroll_to_end(feed).await {
                if !e.is_transient() {
                    return Err(e.into());
                }
                tracing::warn!("Scrolling the listing failed: {}", e);
            }
            tokio::time::sleep(config.crawl.scroll_settle()).await;

            // A failed count is observed as the previous one
            match list.visible_count().await {
                Ok(count) => visible = count,
                Err(e) if e.is_transient() => {
                    tracing::warn!("Counting listing results failed: {}", e);
                }
                Err(e) => return Err(e),
            }

            match convergence.observe(visible) {
                Observation::Converged => {
                    tracing::info!("Listing converged at {} results", visible);
                    break;
                }
                Observation::Stalled => {
                    tracing::debug!("Listing stalled at {} results", visible);
                }
                Observation::Grew | Observation::Capped => {}
            }

            summary.iterations += 1;
            tracing::info!(
                "Iteration {}: {} results visible",
                summary.iterations,
                visible
            );

            let candidates = match list.discover(feed, state).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::error!("Discovery failed: {}", e);
                    continue;
                }
            };

            for place in candidates {
                let crawled = crawl_place(driver, config, primary, feed, place).await;
                if let Some((outcome, place)) = crawled {
                    finish_place(state, places, &**sink, &mut summary, outcome, place)?;
                } else {
                    summary.record(PlaceState::Failed);
                }
            }
        }

        summary.duration_seconds = started.elapsed().as_secs();
        tracing::info!(
            "Crawl completed: {} places stored, {} checkpointed, in {:?}",
            places.len(),
            state.len(),
            started.elapsed()
        );

        Ok(summary)
    }
}

/// Crawls one place, returning its terminal state
///
/// Returns `None` if the detail crawl failed; the place is not checkpointed
/// and will be retried when it is discovered again.
async fn crawl_place<D: PageDriver + ?Sized>(
    driver: &D,
    config: &Config,
    primary: Surface,
    feed: ElementHandle,
    mut place: Place,
) -> Option<(PlaceState, Place)> {
    let detail = DetailCrawler::new(driver, config, primary, feed, Utc::now());
    match detail.crawl(&mut place).await {
        Ok(outcome) => Some((outcome, place)),
        Err(e) => {
            tracing::error!("Failed to crawl {}: {}", place.name, e);
            None
        }
    }
}

/// Persists a place that reached a terminal state
///
/// Completed places join the result set, which is rewritten in full. Completed
/// and skipped places are appended to the checkpoint.
fn finish_place(
    state: &mut CrawlState,
    places: &mut Vec<Place>,
    sink: &dyn OutputSink,
    summary: &mut CrawlSummary,
    outcome: PlaceState,
    place: Place,
) -> Result<()> {
    summary.record(outcome);

    if outcome.is_success() {
        summary.reviews_collected += place.reviews.len() as u64;
        places.retain(|p| p.location_link != place.location_link);
        let link = place.location_link.clone();
        places.push(place);
        sink.persist(places)?;
        state.record(&link)?;
    } else if outcome.is_checkpointed() {
        tracing::info!("Checkpointing skipped place {} ({})", place.name, outcome);
        state.record(&place.location_link)?;
    }

    Ok(())
}

/// Runs the main crawl operation against a live browser
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Whether to ignore the checkpoint and previous results
///
/// # Example
///
/// ```no_run
/// use place_harvest::config::load_config;
/// use place_harvest::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let summary = run_crawl(config, false).await?;
/// println!("{} iterations", summary.iterations);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, fresh: bool) -> Result<CrawlSummary> {
    let driver = ChromeDriver::launch(&config.browser).await?;
    let mut coordinator = Coordinator::new(config, driver, fresh)?;
    coordinator.run().await
}
