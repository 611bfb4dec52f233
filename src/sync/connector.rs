use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    config::{Account, Config, QobuzSettings, SpotifySettings, SyncSettings},
    error::SyncError,
    management::TokenManager,
    qobuz::QobuzClient,
    spotify::{SpotifyClient, auth::OAuthClient},
    sync::{
        extractor::{ApiExtractor, CacheExtractor, TrackExtractor},
        materializer::Destination,
        orchestrator::{AccountConnector, Connection},
    },
    types::{DestinationKind, ExtractMode},
};

/// Connects accounts to the live Spotify and Qobuz services.
///
/// Spotify access tokens come from the per-account token cache written by
/// `discover-sync auth` and are refreshed when they are about to expire.
pub struct LiveConnector {
    http: Client,
    mode: ExtractMode,
    sync: SyncSettings,
    spotify: SpotifySettings,
    qobuz: QobuzSettings,
}

impl LiveConnector {
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &Config, mode: ExtractMode) -> Result<Self, SyncError> {
        let http = Client::builder()
            .timeout(config.sync.http_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            mode,
            sync: config.sync.clone(),
            spotify: config.spotify.clone(),
            qobuz: config.qobuz.clone(),
        })
    }

    async fn spotify_session(&self, account: &Account) -> Result<SpotifyClient, SyncError> {
        let mut tokens = TokenManager::load(&account.index).await.map_err(|e| {
            SyncError::Auth(format!(
                "no cached token for account {} ({}), run `discover-sync auth --account {}`",
                account.index, e, account.index
            ))
        })?;

        let oauth = OAuthClient::for_account(&self.spotify, account);
        let access_token = tokens
            .get_valid_token(&self.http, &oauth)
            .await
            .map_err(SyncError::Auth)?;

        let client = SpotifyClient::new(self.http.clone(), &self.spotify.api_url, access_token);
        client
            .current_user_id()
            .await
            .map_err(|e| SyncError::Auth(format!("token of account {} rejected: {e}", account.index)))?;
        Ok(client)
    }

    fn scrape_extractor(&self) -> Result<Arc<dyn TrackExtractor>, SyncError> {
        #[cfg(feature = "browser")]
        {
            use crate::sync::{browser::ChromeLauncher, scrape::ScrapeExtractor};

            Ok(Arc::new(ScrapeExtractor::new(
                ChromeLauncher,
                &self.spotify.web_url,
                self.sync.render_timeout,
            )))
        }

        #[cfg(not(feature = "browser"))]
        {
            Err(SyncError::Config(
                "scrape mode needs a build with the `browser` feature".to_string(),
            ))
        }
    }
}

#[async_trait]
impl AccountConnector for LiveConnector {
    async fn connect(&self, account: &Account) -> Result<Connection, SyncError> {
        let needs_spotify =
            self.mode == ExtractMode::Api || account.destination == DestinationKind::Spotify;
        let spotify = if needs_spotify {
            Some(self.spotify_session(account).await?)
        } else {
            None
        };

        let extractor: Arc<dyn TrackExtractor> = match (self.mode, &spotify) {
            (ExtractMode::Api, Some(client)) => Arc::new(ApiExtractor::new(client.clone())),
            (ExtractMode::Api, None) => {
                return Err(SyncError::Auth("no Spotify session".to_string()));
            }
            (ExtractMode::Scrape, _) => self.scrape_extractor()?,
            (ExtractMode::Cache, _) => {
                Arc::new(CacheExtractor::new(&self.sync.cache_dir, &account.index))
            }
        };

        let destination: Arc<dyn Destination> = match account.destination {
            DestinationKind::Spotify => match spotify {
                Some(client) => Arc::new(client),
                None => return Err(SyncError::Auth("no Spotify session".to_string())),
            },
            DestinationKind::Qobuz => {
                let credentials = account.credentials.qobuz.as_ref().ok_or_else(|| {
                    SyncError::Auth(format!(
                        "QOBUZ_APP_ID and QOBUZ_USER_AUTH_TOKEN_{} must be set",
                        account.index
                    ))
                })?;
                Arc::new(QobuzClient::new(self.http.clone(), &self.qobuz, credentials))
            }
        };

        Ok(Connection {
            extractor,
            destination,
        })
    }
}
