use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use discover_sync::{
    error::SyncError,
    sync::{
        BrowserLauncher, PageDriver, ScrapeExtractor, ScrollMetrics, ScrollPolicy, ScrollStop,
        TrackExtractor, parse_tracklist, scroll_until_stable,
    },
    types::{PlaylistRef, Track},
};

fn row(href: &str, title: &str, artists: &[&str]) -> String {
    let artist_links: String = artists
        .iter()
        .map(|a| format!(r#"<a href="/artist/{0}">{0}</a>"#, a))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"<div data-testid="tracklist-row">
             <a data-testid="internal-track-link" href="{href}"><div>{title}</div></a>
             <span>{artist_links}</span>
           </div>"#
    )
}

fn page(rows: &[String]) -> String {
    format!(
        r#"<html><body><div class="main-view-container">{}</div></body></html>"#,
        rows.concat()
    )
}

#[test]
fn test_parse_tracklist() {
    let html = page(&[
        row("/track/4dyx5SzxPPaD8xQIid5Wjj", "Around the World", &["Daft Punk"]),
        row("/track/0iOZM63lendWRTTeKhZBSC?si=x", "Mrs. Robinson", &["Simon", "Garfunkel"]),
    ]);

    let tracks = parse_tracklist(&html).unwrap();
    assert_eq!(
        tracks,
        vec![
            Track::new("Around the World", "Daft Punk").with_source_id("4dyx5SzxPPaD8xQIid5Wjj"),
            Track::new("Mrs. Robinson", "Simon, Garfunkel").with_source_id("0iOZM63lendWRTTeKhZBSC"),
        ]
    );
}

#[test]
fn test_parse_tracklist_discards_incomplete_rows() {
    let html = page(&[
        row("/track/a", "", &["Nobody"]),
        row("/track/b", "Instrumental", &[]),
        r#"<div data-testid="tracklist-row"><span>no link</span></div>"#.to_string(),
        row("/track/c", "Kept", &["Someone"]),
    ]);

    let tracks = parse_tracklist(&html).unwrap();
    assert_eq!(tracks, vec![Track::new("Kept", "Someone").with_source_id("c")]);
}

#[test]
fn test_parse_tracklist_uses_link_text_without_inner_div() {
    let html = page(&[r#"<div data-testid="tracklist-row">
        <a data-testid="internal-track-link" href="/track/z">Plain Title</a>
        <a href="/artist/1">Artist</a>
    </div>"#
        .to_string()]);

    let tracks = parse_tracklist(&html).unwrap();
    assert_eq!(tracks[0].title, "Plain Title");
    assert_eq!(tracks[0].artist, "Artist");
}

#[test]
fn test_parse_tracklist_without_rows() {
    assert!(parse_tracklist("<html></html>").unwrap().is_empty());
}

/// Replays a fixed sequence of measurements, one per `metrics` call.
struct StubDriver {
    metrics: Vec<ScrollMetrics>,
    calls: usize,
    scrolled: Arc<Mutex<Vec<f64>>>,
    html: String,
}

impl StubDriver {
    fn new(metrics: Vec<ScrollMetrics>) -> Self {
        Self {
            metrics,
            calls: 0,
            scrolled: Arc::new(Mutex::new(Vec::new())),
            html: String::new(),
        }
    }
}

#[async_trait]
impl PageDriver for StubDriver {
    async fn metrics(&mut self) -> Result<ScrollMetrics, SyncError> {
        let index = self.calls.min(self.metrics.len() - 1);
        self.calls += 1;
        Ok(self.metrics[index])
    }

    async fn scroll_by(&mut self, pixels: f64) -> Result<(), SyncError> {
        self.scrolled.lock().unwrap().push(pixels);
        Ok(())
    }

    async fn content(&mut self) -> Result<String, SyncError> {
        Ok(self.html.clone())
    }
}

fn metrics(scroll_top: f64, scroll_height: f64, rows: usize) -> ScrollMetrics {
    ScrollMetrics {
        scroll_top,
        client_height: 1000.0,
        scroll_height,
        rows,
    }
}

fn fast_policy() -> ScrollPolicy {
    ScrollPolicy {
        settle_delay: Duration::ZERO,
        ..ScrollPolicy::default()
    }
}

#[test]
fn test_default_scroll_policy() {
    let policy = ScrollPolicy::default();
    assert_eq!(policy.scroll_fraction, 0.8);
    assert_eq!(policy.bottom_threshold, 100.0);
    assert_eq!(policy.min_progress, 50.0);
    assert_eq!(policy.max_attempts, 50);
    assert_eq!(policy.settle_delay, Duration::from_millis(500));
}

#[tokio::test]
async fn test_scroll_stops_at_bottom() {
    let mut driver = StubDriver::new(vec![
        metrics(0.0, 5000.0, 30),
        metrics(800.0, 5000.0, 50),
        metrics(1600.0, 5000.0, 70),
        // 3950 + 1000 + 100 >= 5000
        metrics(3950.0, 5000.0, 90),
    ]);
    let scrolled = Arc::clone(&driver.scrolled);

    let stop = scroll_until_stable(&mut driver, &fast_policy()).await.unwrap();

    assert_eq!(stop, ScrollStop::ReachedBottom { attempts: 3 });
    assert_eq!(*scrolled.lock().unwrap(), vec![800.0, 800.0, 800.0]);
}

#[tokio::test]
async fn test_scroll_stops_when_nothing_changes() {
    let mut driver = StubDriver::new(vec![
        metrics(0.0, 9000.0, 30),
        metrics(800.0, 9000.0, 50),
        // rows unchanged and moved by less than 50px
        metrics(820.0, 9000.0, 50),
    ]);

    let stop = scroll_until_stable(&mut driver, &fast_policy()).await.unwrap();
    assert_eq!(stop, ScrollStop::Stalled { attempts: 2 });
}

#[tokio::test]
async fn test_new_rows_count_as_progress() {
    let mut driver = StubDriver::new(vec![
        metrics(0.0, 9000.0, 30),
        // did not move but more rows were rendered
        metrics(0.0, 9000.0, 60),
        metrics(0.0, 9000.0, 60),
    ]);

    let stop = scroll_until_stable(&mut driver, &fast_policy()).await.unwrap();
    assert_eq!(stop, ScrollStop::Stalled { attempts: 2 });
}

#[tokio::test]
async fn test_scroll_gives_up_after_max_attempts() {
    // keeps growing and moving, never reaches the bottom
    let measurements: Vec<ScrollMetrics> = (0..10)
        .map(|i| metrics(i as f64 * 800.0, 1_000_000.0, 30 + i * 20))
        .collect();
    let mut driver = StubDriver::new(measurements);
    let policy = ScrollPolicy {
        max_attempts: 5,
        ..fast_policy()
    };

    let stop = scroll_until_stable(&mut driver, &policy).await.unwrap();
    assert_eq!(stop, ScrollStop::Exhausted { attempts: 5 });
}

struct StubLauncher {
    html: String,
    opened: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl BrowserLauncher for StubLauncher {
    async fn open(&self, url: &str) -> Result<Box<dyn PageDriver>, SyncError> {
        self.opened.lock().unwrap().push(url.to_string());
        let mut driver = StubDriver::new(vec![metrics(0.0, 500.0, 2)]);
        driver.html = self.html.clone();
        Ok(Box::new(driver))
    }
}

#[tokio::test]
async fn test_scrape_extractor() {
    let opened = Arc::new(Mutex::new(Vec::new()));
    let launcher = StubLauncher {
        html: page(&[
            row("/track/a", "One", &["A"]),
            row("/track/b", "Two", &["B", "C"]),
        ]),
        opened: Arc::clone(&opened),
    };
    let extractor = ScrapeExtractor::new(launcher, "https://open.spotify.com/", Duration::from_secs(5))
        .with_policy(fast_policy());

    let tracks = extractor
        .extract(&PlaylistRef::source("37i9dQZEVXcQ", "Discover Weekly"))
        .await
        .unwrap();

    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[1].artist, "B, C");
    assert_eq!(
        *opened.lock().unwrap(),
        vec!["https://open.spotify.com/playlist/37i9dQZEVXcQ".to_string()]
    );
}

#[tokio::test]
async fn test_scrape_extractor_needs_concrete_id() {
    let launcher = StubLauncher {
        html: String::new(),
        opened: Arc::new(Mutex::new(Vec::new())),
    };
    let extractor = ScrapeExtractor::new(launcher, "https://open.spotify.com", Duration::from_secs(5));

    let result = extractor
        .extract(&PlaylistRef::source("auto", "Discover Weekly"))
        .await;
    assert!(matches!(result, Err(SyncError::Extraction(_))));
}

struct SlowLauncher;

#[async_trait]
impl BrowserLauncher for SlowLauncher {
    async fn open(&self, _url: &str) -> Result<Box<dyn PageDriver>, SyncError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(SyncError::Extraction("unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_scrape_extractor_times_out() {
    let extractor =
        ScrapeExtractor::new(SlowLauncher, "https://open.spotify.com", Duration::from_millis(20));

    let result = extractor.extract(&PlaylistRef::source("abc", "Mix")).await;
    match result {
        Err(SyncError::Extraction(msg)) => assert!(msg.contains("timed out")),
        other => panic!("unexpected result: {:?}", other),
    }
}
