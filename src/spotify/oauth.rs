use crate::config::Config;
use crate::error::AppError;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope, TokenUrl,
    basic::{BasicClient, BasicTokenResponse},
    reqwest::async_http_client,
};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Scopes needed to read the profile and write playlists.
pub const SCOPES: [&str; 3] = [
    "user-read-email",
    "playlist-modify-public",
    "playlist-modify-private",
];

/// How long an issued state token stays valid.
pub const STATE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone)]
pub struct OAuthState {
    pub created_at: DateTime<Utc>,
}

/// Outstanding OAuth state tokens, keyed by token.
pub type StateStore = Arc<RwLock<HashMap<String, OAuthState>>>;

pub fn new_state_store() -> StateStore {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Build the OAuth2 client for Spotify's accounts service.
pub fn build_oauth_client(config: &Config) -> anyhow::Result<BasicClient> {
    let client = BasicClient::new(
        ClientId::new(config.spotify_client_id.clone()),
        Some(ClientSecret::new(config.spotify_client_secret.clone())),
        AuthUrl::new(config.spotify_auth_url.clone())?,
        Some(TokenUrl::new(config.spotify_token_url.clone())?),
    )
    .set_redirect_uri(RedirectUrl::new(config.spotify_redirect_uri.clone())?);

    Ok(client)
}

/// Generate a cryptographically random, URL-safe state token.
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Remember a state token, dropping any that have already expired.
pub fn store_state(store: &StateStore, token: String) {
    let now = Utc::now();
    let mut states = store.write().unwrap_or_else(|e| e.into_inner());
    states.retain(|_, state| now - state.created_at < Duration::minutes(STATE_TTL_MINUTES));
    states.insert(token, OAuthState { created_at: now });
}

/// Remove a state token and check that it was issued recently.
///
/// # Errors
/// - `OAuthStateNotFound` if the token was never issued or was already used
/// - `OAuthStateExpired` if it is older than [`STATE_TTL_MINUTES`]
pub fn consume_state(store: &StateStore, token: &str) -> Result<OAuthState, AppError> {
    let state = store
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .remove(token)
        .ok_or(AppError::OAuthStateNotFound)?;

    if Utc::now() - state.created_at > Duration::minutes(STATE_TTL_MINUTES) {
        return Err(AppError::OAuthStateExpired);
    }

    Ok(state)
}

/// Build the Spotify authorization URL for a fresh state token.
///
/// The consent dialog is always shown so users can switch accounts.
pub fn authorize_url(client: &BasicClient, state_token: String) -> String {
    let (auth_url, _csrf_token) = client
        .authorize_url(|| CsrfToken::new(state_token))
        .add_scopes(SCOPES.iter().map(|s| Scope::new(s.to_string())))
        .add_extra_param("show_dialog", "true")
        .url();

    auth_url.to_string()
}

/// Exchange an authorization code for user tokens.
pub async fn exchange_code(
    client: &BasicClient,
    code: String,
) -> Result<BasicTokenResponse, AppError> {
    client
        .exchange_code(AuthorizationCode::new(code))
        .request_async(async_http_client)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "Authorization code exchange failed");
            AppError::SpotifyApi(format!("Failed to exchange authorization code: {}", e))
        })
}

/// Obtain an application token (client-credentials grant) for catalog search.
pub async fn app_access_token(client: &BasicClient) -> Result<String, AppError> {
    use oauth2::TokenResponse;

    let token = client
        .exchange_client_credentials()
        .request_async(async_http_client)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "Client credentials request failed");
            AppError::SpotifyApi(format!("Failed to obtain application token: {}", e))
        })?;

    Ok(token.access_token().secret().to_string())
}
