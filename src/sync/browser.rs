//! Headless Chrome backend of the scrape extractor.
//!
//! `headless_chrome` is a blocking API, every call runs on the blocking
//! thread pool.

use std::sync::Arc;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::Deserialize;

use crate::{
    error::SyncError,
    sync::scrape::{
        BrowserLauncher, PageDriver, ROW_SELECTOR, SCROLL_CONTAINER_SELECTOR, ScrollMetrics,
    },
};

/// Launches a fresh headless Chrome per page.
#[derive(Debug, Default)]
pub struct ChromeLauncher;

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn open(&self, url: &str) -> Result<Box<dyn PageDriver>, SyncError> {
        let url = url.to_string();

        let page = blocking(move || {
            let options = LaunchOptions::default_builder()
                .headless(true)
                .build()
                .map_err(|e| e.to_string())?;
            let browser = Browser::new(options).map_err(|e| e.to_string())?;
            let tab = browser.new_tab().map_err(|e| e.to_string())?;
            tab.navigate_to(&url)
                .and_then(|tab| tab.wait_until_navigated())
                .map_err(|e| format!("cannot load {url}: {e}"))?;
            tab.wait_for_element(SCROLL_CONTAINER_SELECTOR)
                .map(|_| ())
                .map_err(|e| format!("playlist view did not render: {e}"))?;

            Ok(ChromePage {
                _browser: browser,
                tab,
            })
        })
        .await?;

        Ok(Box::new(page))
    }
}

/// An open tab; the browser process lives as long as the page.
struct ChromePage {
    _browser: Browser,
    tab: Arc<Tab>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetrics {
    scroll_top: f64,
    client_height: f64,
    scroll_height: f64,
    rows: usize,
}

impl ChromePage {
    async fn evaluate(&self, script: String) -> Result<serde_json::Value, SyncError> {
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            tab.evaluate(&script, false)
                .map(|object| object.value.unwrap_or(serde_json::Value::Null))
                .map_err(|e| e.to_string())
        })
        .await
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn metrics(&mut self) -> Result<ScrollMetrics, SyncError> {
        // stringified so the result comes back by value
        let script = format!(
            r#"(() => {{
                const c = document.querySelector('{container}');
                const rows = document.querySelectorAll('{rows}').length;
                return JSON.stringify({{
                    scrollTop: c ? c.scrollTop : 0,
                    clientHeight: c ? c.clientHeight : 0,
                    scrollHeight: c ? c.scrollHeight : 0,
                    rows: rows
                }});
            }})()"#,
            container = SCROLL_CONTAINER_SELECTOR,
            rows = ROW_SELECTOR,
        );

        let value = self.evaluate(script).await?;
        let raw = value
            .as_str()
            .ok_or_else(|| SyncError::Extraction("scroll metrics unavailable".to_string()))?;
        let metrics: RawMetrics = serde_json::from_str(raw)
            .map_err(|e| SyncError::Extraction(format!("invalid scroll metrics: {e}")))?;

        Ok(ScrollMetrics {
            scroll_top: metrics.scroll_top,
            client_height: metrics.client_height,
            scroll_height: metrics.scroll_height,
            rows: metrics.rows,
        })
    }

    async fn scroll_by(&mut self, pixels: f64) -> Result<(), SyncError> {
        let script = format!(
            "document.querySelector('{}')?.scrollBy(0, {})",
            SCROLL_CONTAINER_SELECTOR, pixels
        );
        self.evaluate(script).await.map(|_| ())
    }

    async fn content(&mut self) -> Result<String, SyncError> {
        let tab = Arc::clone(&self.tab);
        blocking(move || tab.get_content().map_err(|e| e.to_string())).await
    }
}

async fn blocking<T, F>(work: F) -> Result<T, SyncError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, String> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| SyncError::Extraction(format!("browser task failed: {e}")))?
        .map_err(SyncError::Extraction)
}
