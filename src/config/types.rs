use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Place-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Browser launch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// DevTools websocket URL of an already running Chrome; launches one when unset
    #[serde(rename = "remote-debugging-url", default)]
    pub remote_debugging_url: Option<String>,

    #[serde(default)]
    pub headless: bool,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// UI language passed as `--lang`; the extraction patterns expect English labels
    #[serde(default = "default_language")]
    pub language: String,

    /// Additional command line switches passed to Chrome
    #[serde(rename = "extra-args", default)]
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            remote_debugging_url: None,
            headless: false,
            user_agent: default_user_agent(),
            language: default_language(),
            extra_args: Vec::new(),
        }
    }
}

/// Crawl pacing and convergence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Listing search URL the crawl starts from
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Pause after loading the listing page (milliseconds)
    #[serde(rename = "page-settle-ms", default = "default_page_settle_ms")]
    pub page_settle_ms: u64,

    /// Pause after opening a detail tab (milliseconds)
    #[serde(rename = "detail-settle-ms", default = "default_detail_settle_ms")]
    pub detail_settle_ms: u64,

    /// Pause after every scroll and every stalled observation (milliseconds)
    #[serde(rename = "scroll-settle-ms", default = "default_scroll_settle_ms")]
    pub scroll_settle_ms: u64,

    /// Consecutive unchanged observations before a feed counts as exhausted
    #[serde(rename = "stall-limit", default = "default_stall_limit")]
    pub stall_limit: u32,

    /// Maximum number of reviews rendered per place before the feed is cut off
    #[serde(rename = "review-cap", default = "default_review_cap")]
    pub review_cap: usize,
}

impl CrawlConfig {
    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn detail_settle(&self) -> Duration {
        Duration::from_millis(self.detail_settle_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }
}

/// Element polling budgets
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// How long a single lookup attempt keeps polling (milliseconds)
    #[serde(rename = "attempt-wait-ms", default = "default_attempt_wait_ms")]
    pub attempt_wait_ms: u64,

    /// Pause between failed attempts (milliseconds)
    #[serde(rename = "retry-interval-ms", default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Number of retries for lookups that are allowed to break out early
    #[serde(rename = "breakout-retries", default = "default_breakout_retries")]
    pub breakout_retries: u32,

    /// Total time budget for lookups without a breakout budget (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_poll_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempt_wait_ms: default_attempt_wait_ms(),
            retry_interval_ms: default_retry_interval_ms(),
            breakout_retries: default_breakout_retries(),
            timeout_ms: default_poll_timeout_ms(),
        }
    }
}

impl PollConfig {
    pub fn attempt_wait(&self) -> Duration {
        Duration::from_millis(self.attempt_wait_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Bounds for interactive click sequences (share link capture, tab activation)
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionConfig {
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause after a click before the UI is read again (milliseconds)
    #[serde(rename = "click-settle-ms", default = "default_click_settle_ms")]
    pub click_settle_ms: u64,

    /// How long to wait for the copy-link input to be populated (milliseconds)
    #[serde(rename = "copy-link-timeout-ms", default = "default_copy_link_timeout_ms")]
    pub copy_link_timeout_ms: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            click_settle_ms: default_click_settle_ms(),
            copy_link_timeout_ms: default_copy_link_timeout_ms(),
        }
    }
}

impl InteractionConfig {
    pub fn click_settle(&self) -> Duration {
        Duration::from_millis(self.click_settle_ms)
    }

    pub fn copy_link_timeout(&self) -> Duration {
        Duration::from_millis(self.copy_link_timeout_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Nested JSON document with every completed place
    #[serde(rename = "json-path", default = "default_json_path")]
    pub json_path: String,

    /// Flattened table, one row per review
    #[serde(rename = "csv-path", default = "default_csv_path")]
    pub csv_path: String,

    /// Newline-delimited list of processed location links
    #[serde(rename = "checkpoint-path", default = "default_checkpoint_path")]
    pub checkpoint_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_path: default_json_path(),
            csv_path: default_csv_path(),
            checkpoint_path: default_checkpoint_path(),
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36".to_string()
}

fn default_language() -> String {
    "en-GB".to_string()
}

fn default_page_settle_ms() -> u64 {
    2_000
}

fn default_detail_settle_ms() -> u64 {
    3_000
}

fn default_scroll_settle_ms() -> u64 {
    5_000
}

fn default_stall_limit() -> u32 {
    3
}

fn default_review_cap() -> usize {
    200
}

fn default_attempt_wait_ms() -> u64 {
    10_000
}

fn default_retry_interval_ms() -> u64 {
    10_000
}

fn default_breakout_retries() -> u32 {
    3
}

fn default_poll_timeout_ms() -> u64 {
    120_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_click_settle_ms() -> u64 {
    2_000
}

fn default_copy_link_timeout_ms() -> u64 {
    10_000
}

fn default_json_path() -> String {
    "data.json".to_string()
}

fn default_csv_path() -> String {
    "data.csv".to_string()
}

fn default_checkpoint_path() -> String {
    "crawled.txt".to_string()
}
