//! # Qobuz Integration Module
//!
//! Destination-side client for the Qobuz API. Requests are authenticated with
//! the application id (`X-App-Id`) and a user auth token
//! (`X-User-Auth-Token`), both supplied by configuration.
//!
//! ## API Coverage
//!
//! - `GET track/search` - Free text track search
//! - `GET playlist/getUserPlaylists` - Playlist lookup by name and owner
//! - `POST playlist/create` - Create new playlists
//! - `POST playlist/addTracks` - Add tracks to playlists
//!
//! Qobuz search has no field filters, so a [`TrackQuery`] is rendered as
//! `<title> <artist>`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::{
    config::{QobuzCredentials, QobuzSettings},
    error::SyncError,
    sync::{PlaylistOptions, PlaylistWriter, TrackQuery, TrackSearch},
    types::{PlaylistRef, QobuzPlaylist, QobuzTrackSearchResponse, QobuzUserPlaylistsResponse},
};

/// Track ids accepted by a single `playlist/addTracks` call.
pub const ADD_TRACKS_LIMIT: usize = 50;
const PLAYLISTS_PAGE_LIMIT: u64 = 500;
const MAX_PLAYLIST_PAGES: u64 = 50;

#[derive(Clone)]
pub struct QobuzClient {
    http: Client,
    api_url: String,
    app_id: String,
    user_auth_token: String,
}

impl QobuzClient {
    pub fn new(http: Client, settings: &QobuzSettings, credentials: &QobuzCredentials) -> Self {
        Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            app_id: credentials.app_id.clone(),
            user_auth_token: credentials.user_auth_token.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("X-App-Id", &self.app_id)
            .header("X-User-Auth-Token", &self.user_auth_token)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, reqwest::Error> {
        self.authorized(self.http.get(self.endpoint(path)))
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, reqwest::Error> {
        self.authorized(self.http.post(self.endpoint(path)))
            .form(form)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await
    }

    /// Returns the playlists owned by the authenticated user, paging by offset.
    ///
    /// Subscribed playlists of other users are asked away with
    /// `filter=owner` and dropped again if the response still carries them.
    pub async fn user_playlists(&self) -> Result<Vec<QobuzPlaylist>, reqwest::Error> {
        let mut playlists = Vec::new();
        let mut user_id = None;
        for page in 0..MAX_PLAYLIST_PAGES {
            let offset = page * PLAYLISTS_PAGE_LIMIT;
            let query = [
                ("filter", "owner".to_string()),
                ("limit", PLAYLISTS_PAGE_LIMIT.to_string()),
                ("offset", offset.to_string()),
            ];
            let response: QobuzUserPlaylistsResponse =
                self.get_json("playlist/getUserPlaylists", &query).await?;

            if let Some(user) = response.user {
                user_id = Some(user.id);
            }
            let Some(items) = response.playlists else {
                break;
            };
            let fetched = items.items.len() as u64;
            playlists.extend(items.items.into_iter().filter(|p| p.is_owned_by(user_id)));
            if fetched == 0 || offset + fetched >= items.total {
                break;
            }
        }
        Ok(playlists)
    }
}

#[async_trait]
impl TrackSearch for QobuzClient {
    async fn search_tracks(
        &self,
        query: &TrackQuery,
        limit: u32,
    ) -> Result<Vec<String>, SyncError> {
        let params = [("query", query.free_text()), ("limit", limit.to_string())];
        let response: QobuzTrackSearchResponse = self
            .get_json("track/search", &params)
            .await
            .map_err(|e| SyncError::Search(e.to_string()))?;

        Ok(response
            .tracks
            .map(|t| t.items.into_iter().map(|track| track.id.to_string()).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl PlaylistWriter for QobuzClient {
    fn max_items_per_call(&self) -> usize {
        ADD_TRACKS_LIMIT
    }

    async fn find_playlist(&self, name: &str) -> Result<Option<PlaylistRef>, SyncError> {
        let playlists = self
            .user_playlists()
            .await
            .map_err(|e| SyncError::Materialization(format!("failed to look up '{name}': {e}")))?;

        Ok(playlists
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| PlaylistRef::destination(p.id.to_string(), p.name)))
    }

    async fn create_playlist(
        &self,
        name: &str,
        description: &str,
        options: &PlaylistOptions,
    ) -> Result<PlaylistRef, SyncError> {
        let form = [
            ("name", name.to_string()),
            ("description", description.to_string()),
            ("is_public", u8::from(options.public).to_string()),
            ("is_collaborative", u8::from(options.collaborative).to_string()),
        ];
        let created: QobuzPlaylist = self
            .post_form("playlist/create", &form)
            .await
            .map_err(|e| SyncError::Materialization(format!("failed to create '{name}': {e}")))?;

        Ok(PlaylistRef::destination(created.id.to_string(), created.name))
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<(), SyncError> {
        let form = [
            ("playlist_id", playlist_id.to_string()),
            ("track_ids", track_ids.join(",")),
        ];
        self.post_form::<serde_json::Value>("playlist/addTracks", &form)
            .await
            .map(|_| ())
            .map_err(|e| {
                SyncError::Materialization(format!(
                    "failed to add tracks to {playlist_id}: {e}"
                ))
            })
    }
}
