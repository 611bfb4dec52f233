use async_trait::async_trait;

use crate::{
    error::SyncError,
    spotify::SpotifyClient,
    sync::{PlaylistOptions, PlaylistSource, PlaylistWriter},
    types::{
        AddTrackToPlaylistRequest, AddTrackToPlaylistResponse, CreatePlaylistRequest,
        CreatePlaylistResponse, GetUserPlaylistsResponse, Playlist, PlaylistRef,
        PlaylistTracksPage,
    },
};

/// Items per playlist page, the maximum the endpoint allows.
const TRACKS_PAGE_LIMIT: u32 = 100;
const PLAYLISTS_PAGE_LIMIT: u32 = 50;
const MAX_PLAYLIST_PAGES: usize = 200;
/// Track URIs accepted by a single add call.
pub const ADD_TRACKS_LIMIT: usize = 100;

const TRACK_FIELDS: &str = "items(track(id,name,artists(name))),next";

impl SpotifyClient {
    /// Returns all playlists of the current user, following `next` links.
    pub async fn user_playlists(&self) -> Result<Vec<Playlist>, reqwest::Error> {
        let mut playlists = Vec::new();
        let mut url = self.endpoint("me/playlists");
        let mut query = vec![("limit", PLAYLISTS_PAGE_LIMIT.to_string())];

        for _ in 0..MAX_PLAYLIST_PAGES {
            let page: GetUserPlaylistsResponse = self.get_json(&url, &query, true).await?;
            playlists.extend(page.items.into_iter().flatten());

            match page.next {
                Some(next) if !next.is_empty() => {
                    url = next;
                    query.clear();
                }
                _ => break,
            }
        }

        Ok(playlists)
    }

    /// Creates a playlist for the current user.
    pub async fn create(
        &self,
        name: &str,
        description: &str,
        options: &PlaylistOptions,
    ) -> Result<CreatePlaylistResponse, reqwest::Error> {
        let user_id = self.current_user_id().await?;
        let payload = CreatePlaylistRequest {
            name: name.to_string(),
            description: description.to_string(),
            public: options.public,
            collaborative: options.collaborative,
        };

        self.post(&self.endpoint(&format!("users/{user_id}/playlists")))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json::<CreatePlaylistResponse>()
            .await
    }

    /// Appends tracks, given as URIs, to a playlist.
    pub async fn add_track_uris(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<AddTrackToPlaylistResponse, reqwest::Error> {
        let payload = AddTrackToPlaylistRequest {
            uris: uris.to_vec(),
        };

        self.post(&self.endpoint(&format!("playlists/{playlist_id}/tracks")))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json::<AddTrackToPlaylistResponse>()
            .await
    }
}

#[async_trait]
impl PlaylistSource for SpotifyClient {
    async fn fetch_tracks_page(
        &self,
        playlist_id: &str,
        next: Option<&str>,
    ) -> Result<PlaylistTracksPage, SyncError> {
        let page: Result<PlaylistTracksPage, reqwest::Error> = match next {
            Some(url) => self.get_json(url, &[], true).await,
            None => {
                let url = self.endpoint(&format!("playlists/{playlist_id}/tracks"));
                let query = [
                    ("limit", TRACKS_PAGE_LIMIT.to_string()),
                    ("fields", TRACK_FIELDS.to_string()),
                ];
                self.get_json(&url, &query, true).await
            }
        };

        page.map_err(|e| {
            SyncError::Extraction(format!("failed to read playlist {playlist_id}: {e}"))
        })
    }

    async fn find_playlist_by_name(
        &self,
        name: &str,
        owner: &str,
    ) -> Result<Option<String>, SyncError> {
        let playlists = self
            .user_playlists()
            .await
            .map_err(|e| SyncError::Extraction(format!("failed to list playlists: {e}")))?;

        Ok(playlists
            .into_iter()
            .find(|p| {
                p.name.eq_ignore_ascii_case(name)
                    && p.owner.as_ref().is_some_and(|o| o.id == owner)
            })
            .map(|p| p.id))
    }
}

#[async_trait]
impl PlaylistWriter for SpotifyClient {
    fn max_items_per_call(&self) -> usize {
        ADD_TRACKS_LIMIT
    }

    async fn find_playlist(&self, name: &str) -> Result<Option<PlaylistRef>, SyncError> {
        let lookup = async {
            let user_id = self.current_user_id().await?;
            let playlists = self.user_playlists().await?;
            Ok::<_, reqwest::Error>(playlists.into_iter().find(|p| {
                p.name == name && p.owner.as_ref().is_some_and(|o| o.id == user_id)
            }))
        };

        lookup
            .await
            .map(|found| found.map(|p| PlaylistRef::destination(p.id, p.name)))
            .map_err(|e| SyncError::Materialization(format!("failed to look up '{name}': {e}")))
    }

    async fn create_playlist(
        &self,
        name: &str,
        description: &str,
        options: &PlaylistOptions,
    ) -> Result<PlaylistRef, SyncError> {
        let created = self
            .create(name, description, options)
            .await
            .map_err(|e| SyncError::Materialization(format!("failed to create '{name}': {e}")))?;
        Ok(PlaylistRef::destination(created.id, created.name))
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<(), SyncError> {
        self.add_track_uris(playlist_id, track_ids)
            .await
            .map(|_| ())
            .map_err(|e| {
                SyncError::Materialization(format!(
                    "failed to add tracks to {playlist_id}: {e}"
                ))
            })
    }
}
