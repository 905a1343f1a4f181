//! State tracking for the crawl
//!
//! This module contains:
//! - `CrawlState`: the checkpointed set of processed location links
//! - `PlaceState`: the lifecycle of a single place during a crawl

mod checkpoint;
mod place_state;

pub use checkpoint::CrawlState;
pub use place_state::PlaceState;
