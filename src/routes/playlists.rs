//! Playlist creation and track appends on the user's Spotify account.

use crate::AppState;
use crate::error::AppError;
use crate::playlist::{add_tracks, publish_playlist};
use crate::spotify::parser::normalize_track_uri;
use crate::spotify::token::authorize;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::post,
};
use serde::Deserialize;
use serde_json::{Value, json};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/create_playlist", post(create_playlist))
        .route(
            "/api/add_tracks_to_playlist/{playlist_id}",
            post(add_tracks_to_playlist),
        )
}

fn default_public() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistRequest {
    pub spotify_id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_public")]
    pub public: bool,
}

/// Create a playlist on Spotify and record it locally.
///
/// # Endpoint
/// POST /api/create_playlist
///
/// # Returns
/// - 200 with the Spotify `playlist_id` and `external_url`
/// - 400 if `spotify_id` or `name` is missing
/// - 401 with `needs_auth: true` if the token cannot be refreshed or Spotify refuses
/// - 404 with `needs_auth: true` for an unknown user
async fn create_playlist(
    State(state): State<AppState>,
    payload: Result<Json<CreatePlaylistRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload?;

    let spotify_id = request
        .spotify_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("spotify_id is required".to_string()))?;
    let name = request
        .name
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("name is required".to_string()))?;

    let spotify = authorize(&state.pool, &state.oauth_client, &state.spotify, &spotify_id).await?;

    let (remote, _record) = publish_playlist(
        &state.pool,
        &spotify,
        &spotify_id,
        &name,
        &request.description,
        request.public,
    )
    .await?;

    Ok(Json(json!({
        "status": "success",
        "playlist_id": remote.id,
        "external_url": remote.external_urls.spotify.unwrap_or_default()
    })))
}

#[derive(Debug, Deserialize)]
pub struct AddTracksRequest {
    pub spotify_id: Option<String>,
    pub track_uris: Option<Vec<String>>,
}

/// Append tracks to a playlist in batches of 100.
///
/// # Endpoint
/// POST /api/add_tracks_to_playlist/{playlist_id}
///
/// Entries may be track URIs, open.spotify.com track links or bare IDs.
/// An empty list succeeds without contacting Spotify.
async fn add_tracks_to_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
    payload: Result<Json<AddTracksRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload?;

    let spotify_id = request
        .spotify_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("spotify_id is required".to_string()))?;
    let track_uris = request
        .track_uris
        .ok_or_else(|| AppError::BadRequest("track_uris is required".to_string()))?;

    if track_uris.is_empty() {
        return Ok(Json(json!({
            "status": "success",
            "message": "No tracks to add",
            "added": 0
        })));
    }

    let uris = track_uris
        .iter()
        .map(|entry| {
            normalize_track_uri(entry)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid track reference: {}", entry)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let spotify = authorize(&state.pool, &state.oauth_client, &state.spotify, &spotify_id).await?;
    let added = add_tracks(&spotify, &playlist_id, &uris).await?;

    Ok(Json(json!({
        "status": "success",
        "added": added
    })))
}
