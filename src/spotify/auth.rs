use std::{sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::{Client, Url};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    Res,
    config::{Account, SpotifySettings},
    management::TokenManager,
    server::start_api_server,
    success,
    types::{PkceToken, Token},
    utils, warning,
};

/// Token endpoint client of one Spotify application.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub token_url: String,
}

impl OAuthClient {
    pub fn for_account(settings: &SpotifySettings, account: &Account) -> Self {
        Self {
            client_id: account.credentials.spotify_client_id.clone(),
            client_secret: account.credentials.spotify_client_secret.clone(),
            token_url: settings.token_url(),
        }
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// Applications with a client secret authenticate with HTTP basic auth,
    /// public PKCE clients send their client id in the form. Spotify may omit
    /// `refresh_token` in the response, in which case the previous one is
    /// kept.
    pub async fn refresh_token(&self, client: &Client, refresh_token: &str) -> Result<Token, String> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let mut request = client.post(&self.token_url);
        match &self.client_secret {
            Some(secret) => request = request.basic_auth(&self.client_id, Some(secret)),
            None => form.push(("client_id", self.client_id.as_str())),
        }

        let res = request
            .form(&form)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| format!("token refresh rejected: {e}"))?;

        let json: Value = res.json().await.map_err(|e| e.to_string())?;
        token_from_json(&json, Some(refresh_token))
    }
}

/// Exchanges an authorization code for an access token using PKCE.
///
/// Completes the OAuth 2.0 PKCE flow with the code verifier that was
/// generated when the flow started.
pub async fn exchange_code_pkce(client: &Client, pkce: &PkceToken, code: &str) -> Result<Token, String> {
    let res = client
        .post(&pkce.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", pkce.client_id.as_str()),
            ("code", code),
            ("code_verifier", pkce.code_verifier.as_str()),
            ("redirect_uri", pkce.redirect_uri.as_str()),
        ])
        .send()
        .await
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| format!("code exchange rejected: {e}"))?;

    let json: Value = res.json().await.map_err(|e| e.to_string())?;
    token_from_json(&json, None)
}

/// Builds a [`Token`] from a token endpoint response.
pub fn token_from_json(json: &Value, previous_refresh_token: Option<&str>) -> Result<Token, String> {
    let access_token = json["access_token"]
        .as_str()
        .ok_or_else(|| "token response without access_token".to_string())?;
    let refresh_token = json["refresh_token"]
        .as_str()
        .or(previous_refresh_token)
        .ok_or_else(|| "token response without refresh_token".to_string())?;

    Ok(Token {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
        scope: json["scope"].as_str().unwrap_or_default().to_string(),
        expires_in: json["expires_in"].as_u64().unwrap_or(3600),
        obtained_at: Utc::now().timestamp() as u64,
    })
}

/// Authorization URL the user has to visit to grant access.
pub fn authorize_url(settings: &SpotifySettings, client_id: &str, code_challenge: &str) -> Res<Url> {
    let url = Url::parse_with_params(
        &settings.authorize_url(),
        &[
            ("client_id", client_id),
            ("response_type", "code"),
            ("redirect_uri", settings.redirect_uri.as_str()),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
            ("scope", settings.scope.as_str()),
        ],
    )?;
    Ok(url)
}

/// Runs the OAuth 2.0 PKCE flow for one account and stores its token.
///
/// 1. Generates the code verifier and its SHA256 challenge
/// 2. Starts the local callback server
/// 3. Opens the authorization URL in the default browser
/// 4. Waits up to 60 seconds for the callback to deliver a token
/// 5. Persists the token to the account's token cache
///
/// # Errors
///
/// Returns an error if the authorization URL cannot be built, no token
/// arrives in time, or the token cannot be saved.
pub async fn auth(settings: &SpotifySettings, account: &Account) -> Res<()> {
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);

    let shared_state = Arc::new(Mutex::new(Some(PkceToken {
        code_verifier,
        client_id: account.credentials.spotify_client_id.clone(),
        redirect_uri: settings.redirect_uri.clone(),
        token_url: settings.token_url(),
        token: None,
    })));

    let server_state = Arc::clone(&shared_state);
    let address = settings.server_address.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = start_api_server(server_state, &address).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    let auth_url = authorize_url(settings, &account.credentials.spotify_client_id, &code_challenge)?;
    if webbrowser::open(auth_url.as_str()).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let token = wait_for_token(shared_state).await;
    server.abort();

    match token {
        Some(t) => {
            TokenManager::new(&account.index, t).persist().await?;
            success!("Account {} authenticated.", account.index);
            Ok(())
        }
        None => Err(format!("authentication of account {} failed or timed out", account.index).into()),
    }
}

/// Polls the shared state for the token delivered by the callback handler.
async fn wait_for_token(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Option<Token> {
    use std::time::Instant;

    let max_wait = Duration::from_secs(60);
    let start = Instant::now();

    while start.elapsed() < max_wait {
        let lock = shared_state.lock().await;
        if let Some(token) = lock.as_ref().and_then(|p| p.token.as_ref()) {
            return Some(token.clone());
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}
