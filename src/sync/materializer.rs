use async_trait::async_trait;

use crate::{error::SyncError, sync::matcher::TrackSearch, types::PlaylistRef};

/// Visibility flags of a created playlist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaylistOptions {
    pub public: bool,
    pub collaborative: bool,
}

/// Playlist write access of a destination user.
#[async_trait]
pub trait PlaylistWriter: Send + Sync {
    /// Largest number of track ids a single add call accepts.
    fn max_items_per_call(&self) -> usize;

    async fn find_playlist(&self, name: &str) -> Result<Option<PlaylistRef>, SyncError>;

    async fn create_playlist(
        &self,
        name: &str,
        description: &str,
        options: &PlaylistOptions,
    ) -> Result<PlaylistRef, SyncError>;

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<(), SyncError>;
}

/// A destination service: search plus playlist writes.
pub trait Destination: TrackSearch + PlaylistWriter {}

impl<T: TrackSearch + PlaylistWriter + ?Sized> Destination for T {}

#[derive(Debug, Clone)]
pub struct Materialized {
    pub playlist: PlaylistRef,
    pub added: usize,
}

/// Creates a private playlist and fills it with `track_ids` in order.
///
/// Ids are sent in chunks of the writer's per-call limit. The playlist is
/// created even when `track_ids` is empty.
pub async fn materialize<W: PlaylistWriter + ?Sized>(
    writer: &W,
    name: &str,
    description: &str,
    track_ids: &[String],
) -> Result<Materialized, SyncError> {
    let playlist = writer
        .create_playlist(name, description, &PlaylistOptions::default())
        .await?;

    let chunk_size = writer.max_items_per_call().max(1);
    let mut added = 0;
    for chunk in track_ids.chunks(chunk_size) {
        writer
            .add_tracks(&playlist.id, chunk)
            .await
            .map_err(|e| {
                let reason = match e {
                    SyncError::Materialization(reason) => reason,
                    other => other.to_string(),
                };
                SyncError::Materialization(format!(
                    "{} (added {} of {} tracks to '{}')",
                    reason,
                    added,
                    track_ids.len(),
                    playlist.name
                ))
            })?;
        added += chunk.len();
    }

    Ok(Materialized { playlist, added })
}
