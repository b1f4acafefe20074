//! Spotify OAuth login and the auth check used before playlist creation.

use crate::AppState;
use crate::db::models::User;
use crate::db::repository::{UserLogin, get_user, upsert_user};
use crate::error::AppError;
use crate::spotify::oauth::{
    authorize_url, consume_state, exchange_code, generate_state_token, store_state,
};
use crate::spotify::token::{DEFAULT_TOKEN_LIFETIME_SECS, ensure_valid_token};
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    response::Redirect,
    routing::get,
};
use chrono::{Duration, Utc};
use oauth2::TokenResponse;
use serde::Deserialize;
use serde_json::{Value, json};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/spotify/auth_url", get(auth_url))
        .route("/callback", get(callback))
        .route("/api/check_auth/{spotify_id}", get(check_auth))
}

/// Build a Spotify authorization URL carrying a fresh state token.
///
/// # Endpoint
/// GET /api/spotify/auth_url
async fn auth_url(State(state): State<AppState>) -> Json<Value> {
    let state_token = generate_state_token();
    store_state(&state.state_store, state_token.clone());

    let url = authorize_url(&state.oauth_client, state_token);
    tracing::info!(redirect_url = %url, "Generated Spotify authorization URL");

    Json(json!({
        "status": "success",
        "auth_url": url
    }))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Finish the OAuth flow and send the browser back to the frontend.
///
/// # Endpoint
/// GET /callback?code=<CODE>&state=<STATE>
///
/// # Flow
/// 1. Reject provider errors, a missing code, and unknown or stale state
/// 2. Exchange the code for tokens
/// 3. Fetch the Spotify profile
/// 4. Upsert the user with the new tokens
///
/// Always answers with a redirect: `?auth=success&...` or `?error=<reason>`.
async fn callback(
    State(state): State<AppState>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Redirect {
    let frontend_url = state.config.frontend_url.clone();

    let Query(params) = match query {
        Ok(query) => query,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed callback query");
            return frontend_redirect(&frontend_url, &[("error", "invalid_request")]);
        }
    };

    match complete_login(&state, params).await {
        Ok(user) => {
            let last_login = user
                .last_login
                .unwrap_or_else(Utc::now)
                .format("%Y-%m-%d %-H:%M:%S")
                .to_string();

            tracing::info!(spotify_id = %user.spotify_id, "User logged in");

            frontend_redirect(
                &frontend_url,
                &[
                    ("auth", "success"),
                    ("spotify_id", user.spotify_id.as_str()),
                    ("display_name", user.display_name.as_str()),
                    ("email", user.email.as_deref().unwrap_or("")),
                    ("last_login", last_login.as_str()),
                ],
            )
        }
        Err(reason) => frontend_redirect(&frontend_url, &[("error", reason.as_str())]),
    }
}

async fn complete_login(state: &AppState, params: CallbackQuery) -> Result<User, String> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Spotify returned an authorization error");
        return Err(error);
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        tracing::warn!("Callback without authorization code");
        return Err("missing_code".to_string());
    };

    consume_state(&state.state_store, params.state.as_deref().unwrap_or_default()).map_err(
        |e| {
            tracing::warn!(error = %e, "Rejected OAuth state");
            match e {
                AppError::OAuthStateExpired => "state_expired".to_string(),
                _ => "invalid_state".to_string(),
            }
        },
    )?;

    let token = exchange_code(&state.oauth_client, code)
        .await
        .map_err(|_| "auth_failed".to_string())?;

    let access_token = token.access_token().secret();
    let refresh_token = token.refresh_token().map(|t| t.secret().as_str());
    let lifetime_secs = token
        .expires_in()
        .map(|d| d.as_secs() as i64)
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

    let profile = state
        .spotify
        .current_user(access_token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch Spotify profile");
            "spotify_api_error".to_string()
        })?;

    upsert_user(
        &state.pool,
        UserLogin {
            spotify_id: &profile.id,
            display_name: profile.display_name.as_deref().unwrap_or(""),
            email: profile.email.as_deref(),
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(lifetime_secs),
        },
    )
    .await
    .map_err(|e| {
        tracing::error!(spotify_id = %profile.id, error = ?e, "Failed to store user");
        "database_error".to_string()
    })
}

fn frontend_redirect(frontend_url: &str, params: &[(&str, &str)]) -> Redirect {
    match reqwest::Url::parse_with_params(frontend_url, params) {
        Ok(url) => Redirect::to(url.as_str()),
        Err(e) => {
            tracing::error!(frontend_url = %frontend_url, error = %e, "Invalid frontend URL");
            Redirect::to(frontend_url)
        }
    }
}

/// Report whether the user must log in again before creating playlists.
///
/// # Endpoint
/// GET /api/check_auth/{spotify_id}
///
/// # Returns
/// - 200 with `needs_auth: false` when a fresh token can read playlists
/// - 200 with `needs_auth: true` when tokens are missing, unrefreshable or lack scope
/// - 404 with `needs_auth: true` for an unknown user
async fn check_auth(
    State(state): State<AppState>,
    Path(spotify_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user = get_user(&state.pool, &spotify_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    if !user.has_stored_tokens() {
        tracing::info!(spotify_id = %spotify_id, "User has no stored tokens");
        return Ok(Json(json!({
            "status": "error",
            "message": "Authentication required",
            "needs_auth": true
        })));
    }

    let verified = async {
        let access_token = ensure_valid_token(&state.pool, &state.oauth_client, &user).await?;
        state.spotify.probe_playlist_access(&access_token).await
    }
    .await;

    match verified {
        Ok(()) => Ok(Json(json!({
            "status": "success",
            "needs_auth": false,
            "message": "User is authenticated with playlist permissions"
        }))),
        Err(e) => {
            tracing::warn!(spotify_id = %spotify_id, error = %e, "Token validation failed");
            Ok(Json(json!({
                "status": "error",
                "message": "Authentication or permissions invalid",
                "needs_auth": true
            })))
        }
    }
}
