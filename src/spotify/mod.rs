//! # Spotify Integration Module
//!
//! Thin client for the parts of the Spotify Web API the sync pipeline needs.
//! Spotify acts both as the source service (playlist pages, playlist lookup)
//! and as a destination service (track search, playlist creation, adding
//! tracks).
//!
//! ## Core Modules
//!
//! - [`auth`] - OAuth 2.0 PKCE flow, code exchange and token refresh
//! - [`playlist`] - Playlist reads and writes ([`crate::sync::PlaylistSource`]
//!   and [`crate::sync::PlaylistWriter`])
//! - [`search`] - Track search ([`crate::sync::TrackSearch`])
//!
//! ## API Coverage
//!
//! - `GET /me` - Current user id for playlist creation
//! - `GET /me/playlists` - Playlist lookup by name
//! - `GET /playlists/{playlist_id}/tracks` - Paginated playlist items
//! - `GET /search` - Track search with field filters
//! - `POST /users/{user_id}/playlists` - Create new playlists
//! - `POST /playlists/{playlist_id}/tracks` - Add tracks to playlists
//!
//! ## Rate Limiting
//!
//! Reads of the source playlist retry `502 Bad Gateway` after 10 seconds and
//! `429 Too Many Requests` after the `Retry-After` delay (up to two minutes),
//! a bounded number of times. Searches and writes are sent once.

pub mod auth;
pub mod playlist;
pub mod search;

use std::{sync::Arc, time::Duration};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::{sync::OnceCell, time::sleep};

use crate::types::UserProfile;

const MAX_RETRIES: usize = 3;
const BAD_GATEWAY_DELAY: Duration = Duration::from_secs(10);
const MAX_RETRY_AFTER_SECS: u64 = 120;

/// Authenticated Spotify Web API client of one account.
#[derive(Clone)]
pub struct SpotifyClient {
    http: Client,
    api_url: String,
    access_token: String,
    user_id: Arc<OnceCell<String>>,
}

impl SpotifyClient {
    pub fn new(http: Client, api_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            user_id: Arc::new(OnceCell::new()),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    /// Id of the user the access token belongs to, fetched once.
    pub async fn current_user_id(&self) -> Result<String, reqwest::Error> {
        self.user_id
            .get_or_try_init(|| async {
                let profile: UserProfile = self.get_json(&self.endpoint("me"), &[], true).await?;
                Ok::<_, reqwest::Error>(profile.id)
            })
            .await
            .cloned()
    }

    pub(crate) fn get(&self, url: &str) -> RequestBuilder {
        self.http.get(url).bearer_auth(&self.access_token)
    }

    pub(crate) fn post(&self, url: &str) -> RequestBuilder {
        self.http.post(url).bearer_auth(&self.access_token)
    }

    /// GETs `url` and decodes the JSON body.
    ///
    /// With `retry` set, `502` and `429` responses are retried a bounded
    /// number of times.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        retry: bool,
    ) -> Result<T, reqwest::Error> {
        let mut attempts = 0;
        loop {
            let response = self.get(url).query(query).send().await?;

            if retry && attempts < MAX_RETRIES {
                if let Some(delay) = retry_delay(&response) {
                    attempts += 1;
                    sleep(delay).await;
                    continue;
                }
            }

            return response.error_for_status()?.json::<T>().await;
        }
    }
}

fn retry_delay(response: &Response) -> Option<Duration> {
    match response.status() {
        StatusCode::BAD_GATEWAY => Some(BAD_GATEWAY_DELAY),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(1);
            (retry_after <= MAX_RETRY_AFTER_SECS).then(|| Duration::from_secs(retry_after))
        }
        _ => None,
    }
}
