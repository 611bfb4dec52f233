use std::path::{Path, PathBuf};

use chrono::Utc;
use reqwest::Client;

use crate::{config, spotify::auth::OAuthClient, types::Token};

/// Seconds before expiry at which a token is refreshed.
const REFRESH_MARGIN_SECS: u64 = 240;

/// Cached OAuth token of one account.
pub struct TokenManager {
    token: Token,
    path: PathBuf,
}

impl TokenManager {
    pub fn new(account: &str, token: Token) -> Self {
        Self::at(Self::token_path(account), token)
    }

    pub fn at(path: impl Into<PathBuf>, token: Token) -> Self {
        TokenManager {
            token,
            path: path.into(),
        }
    }

    pub async fn load(account: &str) -> Result<Self, String> {
        Self::load_from(Self::token_path(account)).await
    }

    pub async fn load_from(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let content = async_fs::read_to_string(path)
            .await
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        let token: Token = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        Ok(Self::at(path, token))
    }

    pub async fn persist(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(&self.token).map_err(|e| e.to_string())?;
        async_fs::write(&self.path, json)
            .await
            .map_err(|e| e.to_string())
    }

    /// Returns an access token, refreshing and persisting it first if it is
    /// about to expire.
    pub async fn get_valid_token(
        &mut self,
        client: &Client,
        oauth: &OAuthClient,
    ) -> Result<String, String> {
        if self.is_expired(Utc::now().timestamp() as u64) {
            let new_token = oauth.refresh_token(client, &self.token.refresh_token).await?;
            self.token = new_token;
            if let Err(e) = self.persist().await {
                crate::warning!("Failed to save refreshed token: {}", e);
            }
        }

        Ok(self.token.access_token.clone())
    }

    pub fn is_expired(&self, now: u64) -> bool {
        let expires_at = self.token.obtained_at + self.token.expires_in;
        now >= expires_at.saturating_sub(REFRESH_MARGIN_SECS)
    }

    pub fn token_path(account: &str) -> PathBuf {
        let mut path = config::data_dir();
        path.push(format!("cache/token_{account}.json"));
        path
    }

    pub fn current_token(&self) -> &Token {
        &self.token
    }
}
