//! Place-Harvest main entry point
//!
//! This is the command-line interface for the Place-Harvest review harvester.

use anyhow::Context;
use clap::Parser;
use place_harvest::config::{load_config_with_hash, Config};
use place_harvest::crawler::crawl;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Place-Harvest: an incremental map listing and review harvester
///
/// Place-Harvest scrolls a map search listing in Chrome, opens every business
/// in a second tab and collects its score histogram and reviews. Progress is
/// checkpointed after every business so an interrupted crawl resumes where it
/// stopped.
#[derive(Parser, Debug)]
#[command(name = "place-harvest")]
#[command(version = "1.0.0")]
#[command(about = "An incremental map listing and review harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a fresh crawl, truncating the checkpoint and previous results
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "export_table", "fresh"])]
    dry_run: bool,

    /// Show statistics of the stored results and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_table", "fresh"])]
    stats: bool,

    /// Rebuild the CSV table from the stored JSON results and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "fresh"])]
    export_table: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_table {
        handle_export_table(&config)?;
    } else {
        handle_crawl(config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("place_harvest=info,warn"),
            1 => EnvFilter::new("place_harvest=debug,info"),
            2 => EnvFilter::new("place_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== Place-Harvest Dry Run ===\n");

    println!("Browser:");
    match &config.browser.remote_debugging_url {
        Some(url) => println!("  Connect to: {}", url),
        None => println!("  Launch: {}", if config.browser.headless { "headless" } else { "headed" }),
    }
    println!("  Language: {}", config.browser.language);
    println!("  User agent: {}", config.browser.user_agent);
    if !config.browser.extra_args.is_empty() {
        println!("  Extra args: {}", config.browser.extra_args.join(" "));
    }

    println!("\nCrawl:");
    println!("  Start URL: {}", config.crawl.start_url);
    println!("  Stall limit: {}", config.crawl.stall_limit);
    println!("  Review cap: {}", config.crawl.review_cap);
    println!(
        "  Settle (page/detail/scroll): {}ms / {}ms / {}ms",
        config.crawl.page_settle_ms, config.crawl.detail_settle_ms, config.crawl.scroll_settle_ms
    );

    println!("\nPolling:");
    println!("  Attempt wait: {}ms", config.poll.attempt_wait_ms);
    println!("  Retry interval: {}ms", config.poll.retry_interval_ms);
    println!("  Breakout retries: {}", config.poll.breakout_retries);
    println!("  Timeout: {}ms", config.poll.timeout_ms);

    println!("\nInteraction:");
    println!("  Max attempts: {}", config.interaction.max_attempts);
    println!("  Click settle: {}ms", config.interaction.click_settle_ms);
    println!("  Copy link timeout: {}ms", config.interaction.copy_link_timeout_ms);

    println!("\nOutput:");
    println!("  JSON: {}", config.output.json_path);
    println!("  CSV: {}", config.output.csv_path);
    println!("  Checkpoint: {}", config.output.checkpoint_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics of the stored results
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use place_harvest::output::{load_statistics, print_statistics};

    println!("Results: {}", config.output.json_path);
    println!("Checkpoint: {}\n", config.output.checkpoint_path);

    let stats = load_statistics(
        Path::new(&config.output.json_path),
        Path::new(&config.output.checkpoint_path),
    )
    .with_context(|| format!("Failed to read results from {}", config.output.json_path))?;

    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-table mode: rebuilds the CSV from the JSON results
fn handle_export_table(config: &Config) -> anyhow::Result<()> {
    use place_harvest::output::{load_places, write_table};

    println!("=== Exporting Review Table ===\n");
    println!("Results: {}", config.output.json_path);
    println!("Output: {}", config.output.csv_path);
    println!();

    let places = load_places(Path::new(&config.output.json_path))
        .with_context(|| format!("Failed to read results from {}", config.output.json_path))?;

    let rows = write_table(Path::new(&config.output.csv_path), &places)
        .with_context(|| format!("Failed to write table to {}", config.output.csv_path))?;

    println!(
        "✓ Exported {} rows from {} places to: {}",
        rows,
        places.len(),
        config.output.csv_path
    );

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> Result<(), Box<dyn std::error::Error>> {
    use place_harvest::output::{load_statistics, print_statistics, print_summary};

    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
    } else {
        tracing::info!("Starting crawl (resuming from {})", config.output.checkpoint_path);
    }

    let output = config.output.clone();

    // Run the crawler
    match crawl(config, fresh).await {
        Ok(summary) => {
            tracing::info!("Crawl completed successfully");
            print_summary(&summary);

            println!();
            match load_statistics(
                Path::new(&output.json_path),
                Path::new(&output.checkpoint_path),
            ) {
                Ok(stats) => print_statistics(&stats),
                Err(e) => tracing::warn!("Could not compute result statistics: {}", e),
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
