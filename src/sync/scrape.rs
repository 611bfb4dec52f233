//! Track extraction from the rendered playlist web page.
//!
//! The web player only renders the rows that are close to the viewport, so
//! the page has to be scrolled until every row was loaded. The scroll loop is
//! an explicit polling state machine: scroll, measure, compare against the
//! stop conditions, repeat. Browser mechanics hide behind [`PageDriver`] so
//! the loop and the DOM parsing work with any automation backend.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tokio::time::{sleep, timeout};

use crate::{
    error::SyncError,
    sync::extractor::{AUTO_RESOLVE_ID, TrackExtractor},
    types::{PlaylistRef, Track},
    utils,
};

pub const SCROLL_CONTAINER_SELECTOR: &str = ".main-view-container";
pub const ROW_SELECTOR: &str = r#"div[data-testid="tracklist-row"]"#;
const TITLE_LINK_SELECTOR: &str = r#"a[data-testid="internal-track-link"]"#;
const ARTIST_LINK_SELECTOR: &str = r#"a[href*="/artist/"]"#;

/// Scroll position of the playlist container and the number of rendered rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub client_height: f64,
    pub scroll_height: f64,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct ScrollPolicy {
    /// Share of the viewport height scrolled per step.
    pub scroll_fraction: f64,
    /// Distance from the bottom, in pixels, that counts as "reached".
    pub bottom_threshold: f64,
    /// Minimum movement, in pixels, that still counts as progress.
    pub min_progress: f64,
    pub max_attempts: usize,
    pub settle_delay: Duration,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self {
            scroll_fraction: 0.8,
            bottom_threshold: 100.0,
            min_progress: 50.0,
            max_attempts: 50,
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// Why the scroll loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollStop {
    ReachedBottom { attempts: usize },
    Stalled { attempts: usize },
    Exhausted { attempts: usize },
}

/// A rendered page of a browser session.
#[async_trait]
pub trait PageDriver: Send {
    async fn metrics(&mut self) -> Result<ScrollMetrics, SyncError>;
    async fn scroll_by(&mut self, pixels: f64) -> Result<(), SyncError>;
    async fn content(&mut self) -> Result<String, SyncError>;
}

/// Opens pages in a browser session.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn PageDriver>, SyncError>;
}

/// Scrolls the page until the end of the track list was rendered.
///
/// Stops when the container is within `bottom_threshold` pixels of its total
/// height, when neither the row count nor the scroll position changed
/// noticeably, or after `max_attempts` steps.
pub async fn scroll_until_stable(
    driver: &mut dyn PageDriver,
    policy: &ScrollPolicy,
) -> Result<ScrollStop, SyncError> {
    let mut previous = driver.metrics().await?;
    let distance = (previous.client_height * policy.scroll_fraction).max(1.0);

    for attempt in 1..=policy.max_attempts {
        driver.scroll_by(distance).await?;
        if !policy.settle_delay.is_zero() {
            sleep(policy.settle_delay).await;
        }

        let current = driver.metrics().await?;
        if current.scroll_top + current.client_height + policy.bottom_threshold
            >= current.scroll_height
        {
            return Ok(ScrollStop::ReachedBottom { attempts: attempt });
        }
        if current.rows == previous.rows
            && (current.scroll_top - previous.scroll_top).abs() < policy.min_progress
        {
            return Ok(ScrollStop::Stalled { attempts: attempt });
        }
        previous = current;
    }

    Ok(ScrollStop::Exhausted {
        attempts: policy.max_attempts,
    })
}

/// Parses the track rows of a rendered playlist page.
///
/// Rows without a title or without any artist link are discarded. Row order
/// is kept.
pub fn parse_tracklist(html: &str) -> Result<Vec<Track>, SyncError> {
    let row_selector = selector(ROW_SELECTOR)?;
    let title_selector = selector(TITLE_LINK_SELECTOR)?;
    let title_text_selector = selector("div")?;
    let artist_selector = selector(ARTIST_LINK_SELECTOR)?;

    let document = Html::parse_document(html);
    let tracks = document
        .select(&row_selector)
        .filter_map(|row| {
            let link = row.select(&title_selector).next()?;
            let title = link
                .select(&title_text_selector)
                .next()
                .map(element_text)
                .unwrap_or_else(|| element_text(link));
            if title.is_empty() {
                return None;
            }

            let artist = utils::join_artists(row.select(&artist_selector).map(element_text));
            if artist.is_empty() {
                return None;
            }

            let mut track = Track::new(title, artist);
            if let Some(id) = link.value().attr("href").and_then(track_id_from_href) {
                track = track.with_source_id(id);
            }
            Some(track)
        })
        .collect();

    Ok(tracks)
}

fn selector(css: &str) -> Result<Selector, SyncError> {
    Selector::parse(css)
        .map_err(|e| SyncError::Extraction(format!("invalid selector {css}: {e:?}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn track_id_from_href(href: &str) -> Option<String> {
    let (_, rest) = href.split_once("/track/")?;
    let id = rest.split(['?', '#', '/']).next()?;
    (!id.is_empty()).then(|| id.to_string())
}

/// Extracts tracks by scraping the public playlist page.
pub struct ScrapeExtractor<L> {
    launcher: L,
    web_url: String,
    policy: ScrollPolicy,
    render_timeout: Duration,
}

impl<L: BrowserLauncher> ScrapeExtractor<L> {
    pub fn new(launcher: L, web_url: impl Into<String>, render_timeout: Duration) -> Self {
        Self {
            launcher,
            web_url: web_url.into(),
            policy: ScrollPolicy::default(),
            render_timeout,
        }
    }

    pub fn with_policy(mut self, policy: ScrollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn playlist_url(&self, playlist_id: &str) -> String {
        format!(
            "{}/playlist/{}",
            self.web_url.trim_end_matches('/'),
            playlist_id
        )
    }

    async fn render(&self, url: &str) -> Result<String, SyncError> {
        let mut driver = self.launcher.open(url).await?;
        scroll_until_stable(driver.as_mut(), &self.policy).await?;
        driver.content().await
    }
}

#[async_trait]
impl<L: BrowserLauncher> TrackExtractor for ScrapeExtractor<L> {
    async fn extract(&self, playlist: &PlaylistRef) -> Result<Vec<Track>, SyncError> {
        if playlist.id.eq_ignore_ascii_case(AUTO_RESOLVE_ID) {
            return Err(SyncError::Extraction(format!(
                "playlist '{}' needs a concrete id in scrape mode",
                playlist.name
            )));
        }

        let url = self.playlist_url(&playlist.id);
        let html = timeout(self.render_timeout, self.render(&url))
            .await
            .map_err(|_| {
                SyncError::Extraction(format!(
                    "rendering {} timed out after {}s",
                    url,
                    self.render_timeout.as_secs()
                ))
            })??;

        parse_tracklist(&html)
    }
}
