//! # Playlist Synchronization Pipeline
//!
//! Copies a source playlist to a destination service in four steps:
//!
//! ```text
//! AccountConnector (credentials, tokens)
//!          ↓
//! TrackExtractor  (API pages | rendered page | JSON cache)
//!          ↓
//! Track matcher   (one structured search per track, first hit only)
//!          ↓
//! Materializer    (create private playlist, add ids in chunks)
//! ```
//!
//! The [`orchestrator`] drives these steps for every configured
//! (account, playlist) pair, skips pairs whose playlist for the current week
//! already exists and collects failures into a [`orchestrator::RunReport`].
//!
//! Every seam is a trait so the live service clients in [`crate::spotify`]
//! and [`crate::qobuz`] can be swapped for stubs.

#[cfg(feature = "browser")]
pub mod browser;
pub mod connector;
pub mod extractor;
pub mod matcher;
pub mod materializer;
pub mod orchestrator;
pub mod scrape;

pub use connector::LiveConnector;
pub use extractor::{ApiExtractor, CacheExtractor, PlaylistSource, TrackExtractor};
pub use matcher::{MatchReport, TrackQuery, TrackSearch, match_all, match_track};
pub use materializer::{Destination, Materialized, PlaylistOptions, PlaylistWriter, materialize};
pub use orchestrator::{AccountConnector, Connection, Orchestrator, RunReport, SyncOptions};
pub use scrape::{
    BrowserLauncher, PageDriver, ScrapeExtractor, ScrollMetrics, ScrollPolicy, ScrollStop,
    parse_tracklist, scroll_until_stable,
};
