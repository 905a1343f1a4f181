//! Output module for persisting harvested places
//!
//! This module handles:
//! - Writing the nested JSON result set
//! - Flattening reviews into a CSV table
//! - Computing and printing statistics

mod json;
pub mod stats;
mod table;
mod traits;

pub use json::{load_places, write_places};
pub use stats::{load_statistics, print_statistics, print_summary, CrawlStatistics};
pub use table::{table_rows, write_table, TableRow};
pub use traits::{CrawlSummary, OutputError, OutputResult, OutputSink};

use crate::config::OutputConfig;
use crate::model::Place;
use std::path::PathBuf;

/// Sink writing the JSON result set and the CSV table to disk
#[derive(Debug, Clone)]
pub struct FileOutput {
    json_path: PathBuf,
    csv_path: PathBuf,
}

impl FileOutput {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            json_path: PathBuf::from(&config.json_path),
            csv_path: PathBuf::from(&config.csv_path),
        }
    }
}

impl OutputSink for FileOutput {
    fn persist(&self, places: &[Place]) -> OutputResult<()> {
        write_places(&self.json_path, places)?;
        let rows = write_table(&self.csv_path, places)?;
        tracing::debug!(
            "Persisted {} places and {} review rows",
            places.len(),
            rows
        );
        Ok(())
    }
}
