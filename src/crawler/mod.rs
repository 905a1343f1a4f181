//! Crawler module for listing and detail harvesting
//!
//! This module contains the core crawling logic, including:
//! - Element polling against an asynchronously rendering page
//! - Convergence detection for infinite-scroll feeds
//! - Listing discovery and per-place detail crawling
//! - Review, button and histogram extraction
//! - Overall crawl coordination

pub mod buttons;
pub mod convergence;
mod coordinator;
pub mod detail;
pub mod histogram;
pub mod listing;
pub mod poller;
pub mod review;
pub mod selectors;

pub use buttons::{classify, ButtonAttrs, ButtonKind};
pub use convergence::{Convergence, Observation};
pub use coordinator::{run_crawl, Coordinator};
pub use detail::DetailCrawler;
pub use listing::ListCrawler;
pub use poller::{Poller, WaitBudget};
pub use review::ReviewExtractor;

use crate::config::Config;
use crate::output::CrawlSummary;
use crate::Result;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Launch or connect to Chrome
/// 2. Load the checkpoint and previous results (unless `fresh`)
/// 3. Scroll the listing and crawl every new place
/// 4. Persist results and checkpoint after each place
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Whether to start over, ignoring the checkpoint
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed
/// * `Err(HarvestError)` - Crawl failed
pub async fn crawl(config: Config, fresh: bool) -> Result<CrawlSummary> {
    run_crawl(config, fresh).await
}
