//! Place-Harvest: an incremental harvester for map listings and their reviews
//!
//! This crate drives a browser over an infinite-scroll map listing, opens each
//! business in a secondary tab, and extracts its score histogram and reviews into
//! a deduplicated, resumable dataset.

pub mod config;
pub mod crawler;
pub mod driver;
pub mod model;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for Place-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Driver error: {0}")]
    Driver(#[from] driver::DriverError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Element never appeared: {selector}")]
    ElementMissing { selector: String },

    #[error("Required page structure unavailable: {0}")]
    Structural(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true if the underlying driver failure may succeed on a retry
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Driver(e) if e.is_transient())
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Place-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Coordinator;
pub use driver::{ElementHandle, PageDriver, Surface};
pub use model::{Place, Review, Scores};
pub use state::CrawlState;
