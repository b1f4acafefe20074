use crate::db::models::User;
use crate::db::repository::{get_user, update_tokens};
use crate::error::AppError;
use crate::spotify::client::SpotifyClient;
use chrono::{Duration, Utc};
use oauth2::{RefreshToken, TokenResponse, basic::BasicClient, reqwest::async_http_client};
use sqlx::SqlitePool;
use std::future::Future;

/// Tokens expiring within this margin are refreshed before use.
pub const EXPIRY_MARGIN_MINUTES: i64 = 5;

/// Lifetime assumed when the provider does not report `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Result of a refresh-token exchange.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Present only when the provider rotated the refresh token
    pub refresh_token: Option<String>,
    pub expires_in: Option<std::time::Duration>,
}

/// Exchanges a refresh token for a new access token.
pub trait TokenRefresher {
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<RefreshedToken, AppError>> + Send;
}

impl TokenRefresher for BasicClient {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, AppError> {
        let refresh_token = RefreshToken::new(refresh_token.to_string());

        let token_result = self
            .exchange_refresh_token(&refresh_token)
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "Token refresh request failed");
                AppError::SpotifyApi(format!("Failed to refresh access token: {}", e))
            })?;

        Ok(RefreshedToken {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result.refresh_token().map(|t| t.secret().to_string()),
            expires_in: token_result.expires_in(),
        })
    }
}

/// Return a usable access token for `user`, refreshing it if necessary.
///
/// A stored token that stays valid for more than [`EXPIRY_MARGIN_MINUTES`]
/// is returned without any network call. Otherwise the refresh token is
/// exchanged and the new tokens are persisted with expiry = now + lifetime.
///
/// # Errors
/// - `AuthRequired` if no refresh token is stored or the exchange fails
/// - `Database` if the new tokens cannot be stored
pub async fn ensure_valid_token<R: TokenRefresher>(
    pool: &SqlitePool,
    refresher: &R,
    user: &User,
) -> Result<String, AppError> {
    let now = Utc::now();

    if let (Some(access_token), Some(expires_at)) = (&user.access_token, user.token_expires_at) {
        if expires_at > now + Duration::minutes(EXPIRY_MARGIN_MINUTES) {
            tracing::debug!(
                spotify_id = %user.spotify_id,
                expires_at = %expires_at,
                "Access token still valid, using existing token"
            );
            return Ok(access_token.clone());
        }
    }

    let Some(stored_refresh_token) = user.refresh_token.as_deref() else {
        tracing::warn!(spotify_id = %user.spotify_id, "No refresh token stored");
        return Err(AppError::AuthRequired("no refresh token stored".to_string()));
    };

    tracing::info!(
        spotify_id = %user.spotify_id,
        expires_at = ?user.token_expires_at,
        "Access token expired or expiring soon, refreshing"
    );

    let refreshed = refresher.refresh(stored_refresh_token).await.map_err(|e| {
        tracing::warn!(spotify_id = %user.spotify_id, error = %e, "Token refresh failed");
        AppError::AuthRequired(e.to_string())
    })?;

    let new_refresh_token = refreshed
        .refresh_token
        .as_deref()
        .unwrap_or(stored_refresh_token);

    let lifetime_secs = refreshed
        .expires_in
        .map(|d| d.as_secs() as i64)
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    let new_expires_at = Utc::now() + Duration::seconds(lifetime_secs);

    update_tokens(
        pool,
        &user.spotify_id,
        &refreshed.access_token,
        new_refresh_token,
        new_expires_at,
    )
    .await
    .map_err(|e| {
        tracing::error!(spotify_id = %user.spotify_id, error = ?e, "Failed to update tokens in database");
        AppError::Database(e)
    })?;

    tracing::info!(
        spotify_id = %user.spotify_id,
        refresh_token_rotated = refreshed.refresh_token.is_some(),
        new_expires_at = %new_expires_at,
        "Successfully refreshed and stored access token"
    );

    Ok(refreshed.access_token)
}

/// A Spotify client bound to one user's fresh access token.
pub struct AuthorizedSpotify<'a> {
    pub client: &'a SpotifyClient,
    pub access_token: String,
    pub spotify_id: String,
}

/// Load a user and hand back a client ready for user-scoped calls.
///
/// The token is refreshed at most once; nothing is held after return.
///
/// # Errors
/// - `UserNotFound` if the user never logged in
/// - anything [`ensure_valid_token`] returns
pub async fn authorize<'a, R: TokenRefresher>(
    pool: &SqlitePool,
    refresher: &R,
    client: &'a SpotifyClient,
    spotify_id: &str,
) -> Result<AuthorizedSpotify<'a>, AppError> {
    let user = get_user(pool, spotify_id).await?.ok_or_else(|| {
        tracing::warn!(spotify_id = spotify_id, "User not found in database");
        AppError::UserNotFound
    })?;

    let access_token = ensure_valid_token(pool, refresher, &user).await?;

    Ok(AuthorizedSpotify {
        client,
        access_token,
        spotify_id: user.spotify_id,
    })
}
