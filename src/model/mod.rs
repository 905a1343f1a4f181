//! Harvested record types
//!
//! This module defines the records produced by a crawl:
//! - `Place`: one business from the listing feed
//! - `Review`: one review of a place
//! - `Scores`: the five-bucket star histogram of a place

mod place;
pub mod relative_time;
mod review;
mod scores;

pub use place::Place;
pub use relative_time::{format_relative, resolve_relative};
pub use review::Review;
pub use scores::Scores;
