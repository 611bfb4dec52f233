use std::path::PathBuf;

use async_trait::async_trait;

use crate::{
    error::SyncError,
    management::TrackCacheManager,
    types::{PlaylistItem, PlaylistRef, PlaylistTracksPage, Track},
    utils,
};

/// Playlist id that asks the API extractor to look the playlist up by its
/// logical name among the user's playlists.
pub const AUTO_RESOLVE_ID: &str = "auto";

/// Owner of the curated playlists that `auto` resolution accepts.
pub const CURATED_OWNER: &str = "spotify";

/// Upper bound on followed `next` links, protects against cyclic cursors.
const MAX_PAGES: usize = 1000;

/// Produces the ordered track list of a source playlist.
#[async_trait]
pub trait TrackExtractor: Send + Sync {
    async fn extract(&self, playlist: &PlaylistRef) -> Result<Vec<Track>, SyncError>;
}

/// Paginated read access to source playlists.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Fetches the first page of a playlist when `next` is `None`, otherwise
    /// the page behind the `next` link of the previous page.
    async fn fetch_tracks_page(
        &self,
        playlist_id: &str,
        next: Option<&str>,
    ) -> Result<PlaylistTracksPage, SyncError>;

    /// Finds a playlist of the current user by name that is owned by
    /// `owner`.
    async fn find_playlist_by_name(
        &self,
        name: &str,
        owner: &str,
    ) -> Result<Option<String>, SyncError>;
}

/// Extracts tracks through the paginated playlist API.
pub struct ApiExtractor<S> {
    source: S,
}

impl<S: PlaylistSource> ApiExtractor<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    async fn resolve_id(&self, playlist: &PlaylistRef) -> Result<String, SyncError> {
        if !playlist.id.eq_ignore_ascii_case(AUTO_RESOLVE_ID) {
            return Ok(playlist.id.clone());
        }

        self.source
            .find_playlist_by_name(&playlist.name, CURATED_OWNER)
            .await?
            .ok_or_else(|| {
                SyncError::Extraction(format!(
                    "no playlist named '{}' owned by '{}' found",
                    playlist.name, CURATED_OWNER
                ))
            })
    }
}

#[async_trait]
impl<S: PlaylistSource> TrackExtractor for ApiExtractor<S> {
    async fn extract(&self, playlist: &PlaylistRef) -> Result<Vec<Track>, SyncError> {
        let playlist_id = self.resolve_id(playlist).await?;

        let mut tracks = Vec::new();
        let mut next: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let page = self
                .source
                .fetch_tracks_page(&playlist_id, next.as_deref())
                .await?;
            tracks.extend(page.items.into_iter().filter_map(track_from_item));

            match page.next {
                Some(url) if !url.is_empty() => next = Some(url),
                _ => return Ok(tracks),
            }
        }

        Err(SyncError::Extraction(format!(
            "playlist {} did not finish after {} pages",
            playlist_id, MAX_PAGES
        )))
    }
}

/// Converts a playlist item into a track.
///
/// Items whose track body is null (unavailable media) or that carry no
/// title are dropped.
pub fn track_from_item(item: PlaylistItem) -> Option<Track> {
    let track = item.track?;
    let title = track.name.trim();
    if title.is_empty() {
        return None;
    }

    let artist = utils::join_artists(track.artists.iter().map(|a| a.name.as_str()));
    let mut out = Track::new(title, artist);
    if let Some(id) = track.id.filter(|id| !id.is_empty()) {
        out = out.with_source_id(id);
    }
    Some(out)
}

/// Reads tracks from the JSON cache written by an earlier extraction.
pub struct CacheExtractor {
    cache_dir: PathBuf,
    account: String,
}

impl CacheExtractor {
    pub fn new(cache_dir: impl Into<PathBuf>, account: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            account: account.into(),
        }
    }
}

#[async_trait]
impl TrackExtractor for CacheExtractor {
    async fn extract(&self, playlist: &PlaylistRef) -> Result<Vec<Track>, SyncError> {
        let manager =
            TrackCacheManager::for_playlist(&self.cache_dir, &self.account, &playlist.name)
                .load()
                .await
                .map_err(|e| SyncError::Extraction(format!("cannot read track cache: {e}")))?;
        Ok(manager.into_tracks())
    }
}
