//! Page automation drivers
//!
//! This module contains the driver capability the crawl engine runs against:
//! - The `PageDriver` trait with explicit surface and element handles
//! - A Chrome DevTools driver for live crawling
//! - A snapshot driver that replays saved HTML documents

mod chrome;
mod snapshot;
mod traits;

pub use chrome::ChromeDriver;
pub use snapshot::{ClickRecord, SnapshotDriver};
pub use traits::{DriverError, DriverResult, ElementHandle, PageDriver, Surface};
