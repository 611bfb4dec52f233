//! Configuration management for discover-sync.
//!
//! This module loads `.env` files into the process environment and parses the
//! environment once into an explicit [`Config`] value. The resulting struct is
//! passed by reference to the orchestrator and CLI commands; nothing reads
//! configuration from ambient global state after start-up.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. `.env` file in the current working directory
//! 4. Application defaults (where applicable)
//!
//! Accounts are discovered through indexed keys. Every
//! `SPOTIFY_CLIENT_ID_<idx>` defines one account; its companion keys carry
//! the same `<idx>` suffix:
//!
//! ```text
//! SPOTIFY_CLIENT_ID_1=abc
//! SPOTIFY_CLIENT_SECRET_1=def
//! SPOTIFY_PLAYLIST_MAP_1=Discover Weekly:auto,Release Radar:37i9dQZEVXbdINACbjb1qu
//! SYNC_DESTINATION_1=qobuz
//! QOBUZ_USER_AUTH_TOKEN_1=...
//! ```

use std::{cmp::Ordering, collections::HashMap, env, path::PathBuf, time::Duration};

use crate::{
    error::SyncError,
    types::{DestinationKind, ExtractMode, PlaylistRef},
    utils,
};

/// Name of the application directory below the platform data directory.
pub const APP_DIR: &str = "discover-sync";

const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_SPOTIFY_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
const DEFAULT_SPOTIFY_WEB_URL: &str = "https://open.spotify.com";
const DEFAULT_SPOTIFY_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";
const DEFAULT_SPOTIFY_SCOPE: &str = "playlist-read-private playlist-modify-private";
const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_QOBUZ_API_URL: &str = "https://www.qobuz.com/api.json/0.2";

/// Loads environment variables from `.env` files.
///
/// Creates the application data directory if it doesn't exist and loads the
/// `.env` file located there, followed by a `.env` file in the current working
/// directory. Variables already present in the environment are never
/// overridden.
///
/// The data directory `.env` lives at:
/// - Linux: `~/.local/share/discover-sync/.env`
/// - macOS: `~/Library/Application Support/discover-sync/.env`
/// - Windows: `%LOCALAPPDATA%/discover-sync/.env`
///
/// # Errors
///
/// Returns an error string if the data directory cannot be created or an
/// existing `.env` file cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }

    // a missing working directory .env is fine
    dotenv::dotenv().ok();
    Ok(())
}

/// Platform specific data directory of the application.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

/// Endpoints and OAuth settings of the Spotify integration.
#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub api_url: String,
    pub accounts_url: String,
    pub web_url: String,
    pub redirect_uri: String,
    pub scope: String,
    pub server_address: String,
}

impl SpotifySettings {
    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.accounts_url)
    }

    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_url)
    }
}

#[derive(Debug, Clone)]
pub struct QobuzSettings {
    pub api_url: String,
}

/// Settings of the synchronization pipeline itself.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub extract_mode: ExtractMode,
    pub concurrency: usize,
    pub cache_dir: PathBuf,
    pub write_cache: bool,
    pub http_timeout: Duration,
    pub render_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct QobuzCredentials {
    pub app_id: String,
    pub user_auth_token: String,
}

/// Per-account secrets. Treated as opaque by the pipeline.
#[derive(Clone)]
pub struct Credentials {
    pub spotify_client_id: String,
    pub spotify_client_secret: Option<String>,
    pub qobuz: Option<QobuzCredentials>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("spotify_client_id", &self.spotify_client_id)
            .field("spotify_client_secret", &self.spotify_client_secret.as_ref().map(|_| "***"))
            .field("qobuz", &self.qobuz.as_ref().map(|q| &q.app_id))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub index: String,
    pub credentials: Credentials,
    /// Source playlists in configuration order; `name` is the logical name.
    pub playlists: Vec<PlaylistRef>,
    pub destination: DestinationKind,
}

impl Account {
    pub fn playlist(&self, name: &str) -> Option<&PlaylistRef> {
        self.playlists.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub accounts: Vec<Account>,
    pub sync: SyncSettings,
    pub spotify: SpotifySettings,
    pub qobuz: QobuzSettings,
}

impl Config {
    /// Parses the process environment.
    pub fn from_env() -> Result<Self, SyncError> {
        Self::from_vars(env::vars())
    }

    /// Parses configuration from arbitrary key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if no account is configured, an account
    /// has no playlist map, a playlist map is malformed, or a global setting
    /// cannot be parsed.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let default_destination = match get("SYNC_DESTINATION") {
            Some(raw) => raw.parse::<DestinationKind>().map_err(SyncError::Config)?,
            None => DestinationKind::Spotify,
        };
        let global_qobuz_app_id = get("QOBUZ_APP_ID");

        let mut indexes: Vec<String> = vars
            .keys()
            .filter_map(|k| k.strip_prefix("SPOTIFY_CLIENT_ID_"))
            .filter(|idx| !idx.is_empty())
            .map(str::to_string)
            .collect();
        indexes.sort_by(|a, b| compare_indexes(a, b));

        let mut accounts = Vec::with_capacity(indexes.len());
        for index in indexes {
            let Some(client_id) = get(&format!("SPOTIFY_CLIENT_ID_{index}")) else {
                continue;
            };

            let raw_map = get(&format!("SPOTIFY_PLAYLIST_MAP_{index}")).ok_or_else(|| {
                SyncError::Config(format!("SPOTIFY_PLAYLIST_MAP_{index} must be set"))
            })?;
            let playlists = parse_playlist_map(&raw_map)?;

            let destination = match get(&format!("SYNC_DESTINATION_{index}")) {
                Some(raw) => raw.parse::<DestinationKind>().map_err(SyncError::Config)?,
                None => default_destination,
            };

            let qobuz_app_id =
                get(&format!("QOBUZ_APP_ID_{index}")).or_else(|| global_qobuz_app_id.clone());
            let qobuz = match (qobuz_app_id, get(&format!("QOBUZ_USER_AUTH_TOKEN_{index}"))) {
                (Some(app_id), Some(user_auth_token)) => Some(QobuzCredentials {
                    app_id,
                    user_auth_token,
                }),
                _ => None,
            };

            accounts.push(Account {
                index: index.clone(),
                credentials: Credentials {
                    spotify_client_id: client_id,
                    spotify_client_secret: get(&format!("SPOTIFY_CLIENT_SECRET_{index}")),
                    qobuz,
                },
                playlists,
                destination,
            });
        }

        if accounts.is_empty() {
            return Err(SyncError::Config(
                "no accounts configured, set SPOTIFY_CLIENT_ID_<idx> and SPOTIFY_PLAYLIST_MAP_<idx>"
                    .to_string(),
            ));
        }

        let extract_mode = match get("SYNC_EXTRACT_MODE") {
            Some(raw) => raw.parse::<ExtractMode>().map_err(SyncError::Config)?,
            None => ExtractMode::Api,
        };
        let concurrency = parse_number(get("SYNC_CONCURRENCY"), "SYNC_CONCURRENCY", 1)?.max(1);
        let http_timeout = parse_number(get("SYNC_HTTP_TIMEOUT_SECS"), "SYNC_HTTP_TIMEOUT_SECS", 10)?;
        let render_timeout =
            parse_number(get("SYNC_RENDER_TIMEOUT_SECS"), "SYNC_RENDER_TIMEOUT_SECS", 120)?;
        let write_cache = match get("SYNC_WRITE_CACHE") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                SyncError::Config(format!("SYNC_WRITE_CACHE must be a boolean, got '{raw}'"))
            })?,
            None => true,
        };
        let cache_dir = get("SYNC_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir().join("tracks"));

        Ok(Self {
            accounts,
            sync: SyncSettings {
                extract_mode,
                concurrency: concurrency as usize,
                cache_dir,
                write_cache,
                http_timeout: Duration::from_secs(http_timeout),
                render_timeout: Duration::from_secs(render_timeout),
            },
            spotify: SpotifySettings {
                api_url: get("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_SPOTIFY_API_URL.into()),
                accounts_url: get("SPOTIFY_ACCOUNTS_URL")
                    .unwrap_or_else(|| DEFAULT_SPOTIFY_ACCOUNTS_URL.into()),
                web_url: get("SPOTIFY_WEB_URL").unwrap_or_else(|| DEFAULT_SPOTIFY_WEB_URL.into()),
                redirect_uri: get("SPOTIFY_REDIRECT_URI")
                    .unwrap_or_else(|| DEFAULT_SPOTIFY_REDIRECT_URI.into()),
                scope: get("SPOTIFY_API_AUTH_SCOPE").unwrap_or_else(|| DEFAULT_SPOTIFY_SCOPE.into()),
                server_address: get("SERVER_ADDRESS")
                    .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.into()),
            },
            qobuz: QobuzSettings {
                api_url: get("QOBUZ_API_URL").unwrap_or_else(|| DEFAULT_QOBUZ_API_URL.into()),
            },
        })
    }

    pub fn account(&self, index: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.index == index)
    }
}

/// Parses a playlist map of the form `name:id,name:id`.
///
/// Whitespace around names and ids is trimmed and empty entries are ignored.
/// Only the first `:` separates name and id. Ids given as `spotify:playlist:`
/// URIs or `open.spotify.com` links are reduced to the bare playlist id.
///
/// # Errors
///
/// Returns [`SyncError::Config`] for entries without a `:`, with an empty name
/// or id, for duplicate names, or if the map contains no entry at all.
pub fn parse_playlist_map(raw: &str) -> Result<Vec<PlaylistRef>, SyncError> {
    let mut playlists: Vec<PlaylistRef> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((name, id)) = entry.split_once(':') else {
            return Err(SyncError::Config(format!(
                "playlist map entry '{entry}' must look like name:id"
            )));
        };
        let (name, id) = (name.trim(), utils::spotify_playlist_id(id.trim()));
        if name.is_empty() || id.is_empty() {
            return Err(SyncError::Config(format!(
                "playlist map entry '{entry}' has an empty name or id"
            )));
        }
        if playlists.iter().any(|p| p.name == name) {
            return Err(SyncError::Config(format!(
                "playlist '{name}' is mapped more than once"
            )));
        }
        playlists.push(PlaylistRef::source(id, name));
    }

    if playlists.is_empty() {
        return Err(SyncError::Config("playlist map is empty".to_string()));
    }
    Ok(playlists)
}

fn compare_indexes(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn parse_number(raw: Option<String>, key: &str, default: u64) -> Result<u64, SyncError> {
    match raw {
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| SyncError::Config(format!("{key} must be a number, got '{value}'"))),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
