use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

/// State shared between the `auth` command and the callback handler.
#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub token_url: String,
    pub token: Option<Token>,
}

/// A single track as extracted from a source playlist.
///
/// Serialized as `{"track": ..., "artist": ...}` so cache files stay
/// compatible with the plain JSON dumps other tools produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    #[serde(rename = "track")]
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl Track {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            source_id: None,
        }
    }

    pub fn with_source_id(mut self, id: impl Into<String>) -> Self {
        self.source_id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Service {
    Source,
    Destination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRef {
    pub service: Service,
    pub id: String,
    pub name: String,
}

impl PlaylistRef {
    pub fn source(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            service: Service::Source,
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn destination(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            service: Service::Destination,
            id: id.into(),
            name: name.into(),
        }
    }
}

/// How tracks are pulled from the source service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    Api,
    Scrape,
    Cache,
}

impl FromStr for ExtractMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(ExtractMode::Api),
            "scrape" => Ok(ExtractMode::Scrape),
            "cache" => Ok(ExtractMode::Cache),
            other => Err(format!(
                "unknown extract mode '{}', expected api, scrape or cache",
                other
            )),
        }
    }
}

impl fmt::Display for ExtractMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractMode::Api => "api",
            ExtractMode::Scrape => "scrape",
            ExtractMode::Cache => "cache",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    Spotify,
    Qobuz,
}

impl FromStr for DestinationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spotify" => Ok(DestinationKind::Spotify),
            "qobuz" => Ok(DestinationKind::Qobuz),
            other => Err(format!(
                "unknown destination '{}', expected spotify or qobuz",
                other
            )),
        }
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DestinationKind::Spotify => "spotify",
            DestinationKind::Qobuz => "qobuz",
        };
        f.write_str(s)
    }
}

/// Counters of a single (account, playlist) run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    pub playlist_name: String,
    pub tracks_found: usize,
    pub tracks_matched: usize,
    pub tracks_added: usize,
}

impl SyncResult {
    pub fn new(playlist_name: impl Into<String>) -> Self {
        Self {
            playlist_name: playlist_name.into(),
            ..Default::default()
        }
    }

    /// `tracks_added <= tracks_matched <= tracks_found`
    pub fn is_consistent(&self) -> bool {
        self.tracks_added <= self.tracks_matched && self.tracks_matched <= self.tracks_found
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Pending,
    Extracting,
    Matching,
    Materializing,
    Done,
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncState::Pending => "pending",
            SyncState::Extracting => "extracting",
            SyncState::Matching => "matching",
            SyncState::Materializing => "materializing",
            SyncState::Done => "done",
            SyncState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Final record of one (account, playlist) pair.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub account: String,
    pub playlist: String,
    pub state: SyncState,
    /// State the pair was in when it failed.
    pub failed_in: Option<SyncState>,
    pub result: SyncResult,
    pub destination: Option<PlaylistRef>,
    pub skipped_existing: bool,
    pub failure: Option<String>,
}

impl SyncOutcome {
    pub fn is_failed(&self) -> bool {
        self.state == SyncState::Failed
    }
}

#[derive(Tabled)]
pub struct SyncTableRow {
    pub account: String,
    pub playlist: String,
    pub state: String,
    pub found: usize,
    pub matched: usize,
    pub added: usize,
    pub note: String,
}

#[derive(Tabled)]
pub struct AccountTableRow {
    pub account: String,
    pub playlist: String,
    pub id: String,
    pub destination: String,
    pub token: String,
}

// Spotify wire types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTracksPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub track: Option<PlaylistTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTrack {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserPlaylistsResponse {
    #[serde(default)]
    pub items: Vec<Option<Playlist>>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub owner: Option<PlaylistOwner>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
    pub public: bool,
    pub collaborative: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylistResponse {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistRequest {
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistResponse {
    pub snapshot_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub tracks: Option<SearchTracks>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTracks {
    #[serde(default)]
    pub items: Vec<SearchTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTrack {
    pub id: String,
    pub uri: String,
}

// Qobuz wire types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QobuzTrackSearchResponse {
    pub tracks: Option<QobuzItems<QobuzTrack>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QobuzUserPlaylistsResponse {
    /// The authenticated user, owner of the playlists asked for.
    #[serde(default)]
    pub user: Option<QobuzOwner>,
    pub playlists: Option<QobuzItems<QobuzPlaylist>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QobuzItems<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QobuzTrack {
    pub id: u64,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QobuzPlaylist {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub owner: Option<QobuzOwner>,
}

impl QobuzPlaylist {
    /// Whether the playlist belongs to `user_id`. Playlists without owner
    /// information are only trusted when the user is unknown too.
    pub fn is_owned_by(&self, user_id: Option<u64>) -> bool {
        match (user_id, &self.owner) {
            (Some(user_id), Some(owner)) => owner.id == user_id,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QobuzOwner {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}
