//! Integration tests for the crawler
//!
//! These tests replay saved listing and detail pages through the snapshot
//! driver and run the full crawl cycle end-to-end.

use place_harvest::config::{
    BrowserConfig, Config, CrawlConfig, InteractionConfig, OutputConfig, PollConfig,
};
use place_harvest::crawler::Coordinator;
use place_harvest::driver::SnapshotDriver;
use place_harvest::output::load_places;
use place_harvest::state::PlaceState;
use std::path::Path;
use tempfile::TempDir;

const LISTING: &str = "https://maps.test/search/hotels";
const SOL: &str = "https://maps.test/place/sol/data=!4m7!3m6!1s0x1:0xa";
const LUNA: &str = "https://maps.test/place/luna";
const PEPE: &str = "https://maps.test/place/pepe";
const TORO: &str = "https://maps.test/place/toro";
const ROTO: &str = "https://maps.test/place/roto";

/// Creates a test configuration with every delay set to zero
fn create_test_config(dir: &Path) -> Config {
    Config {
        browser: BrowserConfig::default(),
        crawl: CrawlConfig {
            start_url: LISTING.to_string(),
            page_settle_ms: 0,
            detail_settle_ms: 0,
            scroll_settle_ms: 0,
            stall_limit: 3,
            review_cap: 200,
        },
        poll: PollConfig {
            attempt_wait_ms: 0,
            retry_interval_ms: 0,
            breakout_retries: 0,
            timeout_ms: 0,
        },
        interaction: InteractionConfig {
            max_attempts: 2,
            click_settle_ms: 0,
            copy_link_timeout_ms: 0,
        },
        output: OutputConfig {
            json_path: dir.join("data.json").display().to_string(),
            csv_path: dir.join("data.csv").display().to_string(),
            checkpoint_path: dir.join("crawled.txt").display().to_string(),
        },
    }
}

fn card(name: &str, rating: &str, count: &str, link: &str, id: &str) -> String {
    format!(
        r#"<div class="TFQHme "></div>
        <div>
            <a aria-label="{name}" href="{link}" jslog="track:click;metadata:{id}"></a>
            <div>{name}</div>
            <div>{rating}({count})</div>
            <div>Hotel · Calle Mayor</div>
        </div>"#
    )
}

fn listing_page() -> String {
    let cards = [
        card("Hotel Sol", "4.5", "1,204", SOL, "0x1:0xa"),
        card("Hostal Luna", "3.9", "12", LUNA, "0x2:0xb"),
        card("Casa Pepe", "4.1", "87", PEPE, "0x3:0xc"),
        card("Bar Toro", "4.0", "9", TORO, "0x4:0xd"),
        card("Cafe Roto", "2.5", "3", ROTO, "0x5:0xe"),
    ]
    .join("\n");

    format!(
        r#"<html><body>
        <div role="feed" aria-label="Results for hotels">
            <div class="m6QErb">Results</div>
            <div role="presentation"></div>
            {cards}
        </div>
        </body></html>"#
    )
}

fn histogram() -> String {
    [
        "5 stars, 1,000 reviews",
        "4 stars, 150 reviews",
        "3 stars, 30 reviews",
        "2 stars, 10 reviews",
        "1 stars, 14 reviews",
    ]
    .iter()
    .map(|label| format!(r#"<tr role="img" aria-label="{label}"><td></td></tr>"#))
    .collect()
}

fn review(id: &str, author: &str, count: &str, rating: &str, when: &str, body: &str) -> String {
    format!(
        r#"<div class="jftiEf fontBodyMedium " data-review-id="{id}">
            <div>{author}</div>
            <div>{count}</div>
            <div>{rating}/5</div>
            <div>{when}</div>
            <div id="{id}">{body}</div>
            <button data-review-id="{id}" aria-label="Like" title="3 likes"></button>
            <button data-review-id="{id}" aria-label="Share {author}'s review"></button>
        </div>"#
    )
}

fn detail_page(with_histogram: bool, with_tab: bool, reviews: &[String]) -> String {
    let rows = if with_histogram { histogram() } else { String::new() };
    let tabs = if with_tab {
        r#"<button role="tab" aria-label="Overview"></button>
           <button role="tab" aria-label="Reviews for this place"></button>"#
    } else {
        r#"<button role="tab" aria-label="Overview"></button>"#
    };

    format!(
        r#"<html><body>
        <table>{rows}</table>
        {tabs}
        <div class="m6QErb DxyBCb">
            <div aria-label="Refine reviews"></div>
            {reviews}
        </div>
        <div class="share">
            <input jsaction="pane.copyLink.clickInput" value="https://maps.app.test/share">
            <button aria-label="Close">Close</button>
        </div>
        </body></html>"#,
        reviews = reviews.join("\n")
    )
}

fn snapshot_driver() -> SnapshotDriver {
    let sol_reviews = vec![
        review("sol1", "Ana Lopez", "12 reviews", "5", "2 weeks ago", "Lovely rooftop pool"),
        r#"<div class="jftiEf fontBodyMedium " data-review-id="sol2"><div>random junk with no structure</div></div>"#
            .to_string(),
    ];

    let pepe1 = review("pepe1", "Ben Ortiz", "1 review", "4", "a month ago", "Good tapas");
    let pepe2 = review("pepe2", "Carla Ruiz", "3 reviews", "3", "3 days ago", "Noisy");

    SnapshotDriver::new()
        .with_page(LISTING, listing_page())
        .with_page(SOL, detail_page(true, true, &sol_reviews))
        .with_page(LUNA, detail_page(false, true, &[]))
        .with_stages(
            PEPE,
            vec![
                detail_page(true, true, &[]),
                detail_page(true, true, &[pepe1.clone()]),
                detail_page(true, true, &[pepe1, pepe2]),
            ],
        )
        .with_page(TORO, detail_page(true, false, &[]))
}

#[tokio::test]
async fn test_full_crawl() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());

    let mut coordinator = Coordinator::new(config.clone(), snapshot_driver(), true).unwrap();
    let summary = coordinator.run().await.unwrap();

    // One growth pass and two stalled passes; the third stall converges
    assert_eq!(summary.iterations, 3);
    assert_eq!(summary.count(PlaceState::Completed), 2);
    assert_eq!(summary.count(PlaceState::NoHistogram), 1);
    assert_eq!(summary.count(PlaceState::NoReviewsTab), 1);
    // The unreachable place is retried on every pass
    assert_eq!(summary.count(PlaceState::Failed), 3);
    assert_eq!(summary.reviews_collected, 3);

    let driver = coordinator.driver();
    assert_eq!(
        driver.opened(),
        vec![LISTING, SOL, LUNA, PEPE, TORO, ROTO, ROTO, ROTO]
    );
    // Every detail surface was closed again
    assert_eq!(driver.open_surfaces().len(), 1);

    // Result set
    let places = load_places(Path::new(&config.output.json_path)).unwrap();
    let names: Vec<_> = places.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Hotel Sol", "Casa Pepe"]);

    let sol = &places[0];
    assert_eq!(sol.google_id, "0x1:0xa");
    assert_eq!(sol.reviews_total, "1204");
    assert_eq!(sol.reviews_link.as_deref(), Some(SOL));
    assert_eq!(sol.reviews_id.as_deref(), Some("!4m7!3m6!1s0x1:0xa"));
    let scores = sol.reviews_per_score.as_ref().unwrap();
    assert_eq!(scores.five_stars, "1000");
    assert_eq!(scores.one_star, "14");

    assert_eq!(sol.reviews.len(), 1);
    let ana = &sol.reviews[0];
    assert_eq!(ana.review_id, "sol1");
    assert_eq!(ana.author_title, "Ana Lopez");
    assert_eq!(ana.review_rating, "5");
    assert_eq!(ana.review_timestamp, "2 weeks ago");
    assert!(ana.review_datetime_utc.is_some());
    assert_eq!(ana.review_text, "Lovely rooftop pool");
    assert_eq!(ana.review_likes.as_deref(), Some("3"));
    assert_eq!(ana.review_link.as_deref(), Some("https://maps.app.test/share"));
    assert_eq!(ana.owner_answer, "");
    assert_eq!(ana.owner_answer_timestamp, "");

    let pepe = &places[1];
    assert!(pepe.reviews_id.is_none());
    let ids: Vec<_> = pepe.reviews.iter().map(|r| r.review_id.as_str()).collect();
    assert_eq!(ids, vec!["pepe1", "pepe2"]);

    // Checkpoint holds completed and skipped places, in order, but not failures
    let checkpoint = std::fs::read_to_string(&config.output.checkpoint_path).unwrap();
    let lines: Vec<_> = checkpoint.lines().collect();
    assert_eq!(lines, vec![SOL, LUNA, PEPE, TORO]);

    // One CSV row per review
    let mut reader = csv::Reader::from_path(&config.output.csv_path).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][0], "Hotel Sol");
    assert_eq!(&rows[1][0], "Casa Pepe");
    assert_eq!(&rows[2][0], "Casa Pepe");
    assert_eq!(&rows[1][1], &rows[2][1]);
}

#[tokio::test]
async fn test_each_review_element_extracted_once() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());

    let mut coordinator = Coordinator::new(config, snapshot_driver(), true).unwrap();
    coordinator.run().await.unwrap();

    // pepe1 is rendered in two stages but shared only once
    let shares: Vec<_> = coordinator
        .driver()
        .clicks()
        .into_iter()
        .filter(|c| c.url == PEPE)
        .filter_map(|c| c.label)
        .filter(|label| label.starts_with("Share"))
        .collect();
    assert_eq!(shares, vec!["Share Ben Ortiz's review", "Share Carla Ruiz's review"]);
}

#[tokio::test]
async fn test_resume_skips_checkpointed_places() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());

    let mut first = Coordinator::new(config.clone(), snapshot_driver(), true).unwrap();
    first.run().await.unwrap();

    let mut second = Coordinator::new(config.clone(), snapshot_driver(), false).unwrap();
    assert_eq!(second.places().len(), 2);

    let summary = second.run().await.unwrap();

    // Only the failed place is retried, once per pass
    assert_eq!(second.driver().opened(), vec![LISTING, ROTO, ROTO, ROTO]);
    assert_eq!(summary.count(PlaceState::Completed), 0);
    assert_eq!(summary.count(PlaceState::Failed), 3);

    // Earlier results survive the rewrite
    let places = load_places(Path::new(&config.output.json_path)).unwrap();
    assert_eq!(places.len(), 2);

    let checkpoint = std::fs::read_to_string(&config.output.checkpoint_path).unwrap();
    assert_eq!(checkpoint.lines().count(), 4);
}

#[tokio::test]
async fn test_preexisting_checkpoint_is_honored() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    std::fs::write(&config.output.checkpoint_path, format!("{}\n{}\n", SOL, PEPE)).unwrap();

    let mut coordinator = Coordinator::new(config.clone(), snapshot_driver(), false).unwrap();
    coordinator.run().await.unwrap();

    let opened = coordinator.driver().opened();
    assert!(!opened.iter().any(|url| url == SOL));
    assert!(!opened.iter().any(|url| url == PEPE));
    assert!(opened.iter().any(|url| url == LUNA));

    // No place completed, so nothing was written
    assert!(!Path::new(&config.output.json_path).exists());
}

#[tokio::test]
async fn test_fresh_discards_checkpoint() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    std::fs::write(&config.output.checkpoint_path, format!("{}\n", SOL)).unwrap();

    let mut coordinator = Coordinator::new(config, snapshot_driver(), true).unwrap();
    coordinator.run().await.unwrap();

    assert!(coordinator.driver().opened().iter().any(|url| url == SOL));
}

#[tokio::test]
async fn test_card_rendered_during_stall_is_discovered() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());

    // The result count stays at one while the card text fills in
    let loading = r#"<html><body>
        <div role="feed" aria-label="Results for hotels">
            <div role="presentation"></div>
            <div class="TFQHme "></div>
            <div><a aria-label="Hotel Sol" href="https://maps.test/place/sol/data=!4m7!3m6!1s0x1:0xa"
                    jslog="track:click;metadata:0x1:0xa"></a><div>Loading</div></div>
        </div>
        </body></html>"#
        .to_string();
    let rendered = format!(
        r#"<html><body>
        <div role="feed" aria-label="Results for hotels">
            <div role="presentation"></div>
            {}
        </div>
        </body></html>"#,
        card("Hotel Sol", "4.5", "12", SOL, "0x1:0xa")
    );

    let driver = SnapshotDriver::new()
        .with_stages(LISTING, vec![loading.clone(), loading, rendered])
        .with_page(SOL, detail_page(true, true, &[]));

    let mut coordinator = Coordinator::new(config.clone(), driver, true).unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(coordinator.driver().opened(), vec![LISTING, SOL]);
    assert_eq!(summary.count(PlaceState::Completed), 1);

    let checkpoint = std::fs::read_to_string(&config.output.checkpoint_path).unwrap();
    assert_eq!(checkpoint.lines().collect::<Vec<_>>(), vec![SOL]);
}
