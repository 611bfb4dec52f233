use std::path::{Path, PathBuf};

use crate::{types::Track, utils};

/// JSON dump of the tracks extracted from one source playlist.
///
/// The file is a plain array of `{"track": ..., "artist": ...}` objects so it
/// can be inspected by hand and read back by the cache extractor.
pub struct TrackCacheManager {
    path: PathBuf,
    tracks: Vec<Track>,
}

impl TrackCacheManager {
    pub fn new(path: impl Into<PathBuf>, tracks: Option<Vec<Track>>) -> Self {
        Self {
            path: path.into(),
            tracks: tracks.unwrap_or_default(),
        }
    }

    /// Cache location of a logical playlist of an account below `cache_dir`.
    pub fn for_playlist(cache_dir: &Path, account: &str, playlist: &str) -> Self {
        Self::new(Self::cache_path(cache_dir, account, playlist), None)
    }

    pub async fn load(&self) -> Result<Self, String> {
        let content = async_fs::read_to_string(&self.path)
            .await
            .map_err(|e| format!("{}: {}", self.path.display(), e))?;
        let tracks: Vec<Track> = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        Ok(Self {
            path: self.path.clone(),
            tracks,
        })
    }

    pub async fn persist(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(&self.tracks).map_err(|e| e.to_string())?;
        async_fs::write(&self.path, json)
            .await
            .map_err(|e| e.to_string())
    }

    pub fn set_tracks(&mut self, tracks: Vec<Track>) -> &mut Self {
        self.tracks = tracks;
        self
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cache_path(cache_dir: &Path, account: &str, playlist: &str) -> PathBuf {
        let mut path = cache_dir.to_path_buf();
        path.push(utils::file_stem(account));
        path.push(format!("{}_tracks.json", utils::file_stem(playlist)));
        path
    }
}
