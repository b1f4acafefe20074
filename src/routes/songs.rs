//! Swipe deck: fetching candidate songs and recording swipes.

use crate::AppState;
use crate::catalog::{AppCatalog, DEFAULT_LIMIT, MAX_LIMIT, fetch_tracks, parse_genres};
use crate::db::models::{NewSong, SwipeDirection};
use crate::db::sessions::{ensure_song, get_session, record_swipe, session_seen_track_ids};
use crate::error::AppError;
use crate::spotify::models::SongPayload;
use crate::spotify::oauth::app_access_token;
use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::{get, post},
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashSet;
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/get_song", get(get_song))
        .route("/api/swipe", post(swipe))
}

#[derive(Debug, Deserialize)]
pub struct GetSongQuery {
    pub genre: Option<String>,
    pub limit: Option<String>,
    pub spotify_id: Option<String>,
    pub session_id: Option<String>,
}

fn parse_limit(raw: Option<&str>) -> Result<usize, AppError> {
    match raw.map(str::trim).filter(|l| !l.is_empty()) {
        None => Ok(DEFAULT_LIMIT),
        Some(raw) if raw.bytes().all(|b| b.is_ascii_digit()) => {
            // digits that overflow usize still mean "more than the cap"
            Ok(raw.parse::<usize>().map_or(MAX_LIMIT, |limit| limit.min(MAX_LIMIT)))
        }
        Some(raw) => Err(AppError::BadRequest(format!("Invalid limit: {}", raw))),
    }
}

/// Fetch a batch of fresh songs for the swipe deck.
///
/// # Endpoint
/// GET /api/get_song?genre=<G1,G2>&limit=<N>&spotify_id=<ID>&session_id=<UUID>
///
/// With a known `session_id`, songs already swiped in that session are
/// skipped and every returned song is stored. Both steps are best-effort.
async fn get_song(
    State(state): State<AppState>,
    query: Result<Query<GetSongQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = query?;

    let genres = parse_genres(params.genre.as_deref());
    let limit = parse_limit(params.limit.as_deref())?;

    tracing::info!(
        genres = ?genres,
        limit,
        spotify_id = params.spotify_id.as_deref().unwrap_or("anonymous"),
        "Fetching songs"
    );

    let session_id = match params.session_id.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => known_session(&state, raw).await,
        None => None,
    };

    let seen = match session_id {
        Some(session_id) => session_seen_track_ids(&state.pool, session_id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(session_id = %session_id, error = ?e, "Could not load seen songs");
                HashSet::new()
            }),
        None => HashSet::new(),
    };

    let catalog = AppCatalog {
        client: &state.spotify,
        access_token: app_access_token(&state.oauth_client).await?,
    };
    let mut rng = StdRng::from_entropy();

    let tracks = fetch_tracks(
        &catalog,
        &state.previews,
        &genres,
        limit,
        &seen,
        &mut rng,
    )
    .await?;

    if session_id.is_some() {
        for track in &tracks {
            if let Err(e) = ensure_song(&state.pool, &NewSong::from(track)).await {
                tracing::warn!(spotify_id = %track.spotify_id, error = ?e, "Failed to store song");
            }
        }
    }

    Ok(Json(json!({
        "status": "success",
        "data": {
            "tracks": tracks,
            "total": tracks.len(),
            "next_offset": null
        }
    })))
}

async fn known_session(state: &AppState, raw: &str) -> Option<Uuid> {
    let Ok(session_id) = Uuid::parse_str(raw) else {
        tracing::warn!(session_id = %raw, "Ignoring malformed session id");
        return None;
    };

    match get_session(&state.pool, session_id).await {
        Ok(Some(_)) => Some(session_id),
        Ok(None) => {
            tracing::warn!(session_id = %session_id, "Ignoring unknown session id");
            None
        }
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = ?e, "Session lookup failed");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub session_id: Option<String>,
    pub song_data: Option<SongPayload>,
    pub direction: Option<String>,
}

/// Record a LEFT or RIGHT swipe on a song.
///
/// # Endpoint
/// POST /api/swipe
///
/// The song is stored first (or reused by Spotify ID), then the swipe is
/// appended with the next order number for the session.
///
/// # Returns
/// - 200 with the new `swipe_id`
/// - 400 for missing fields or an unknown direction
/// - 404 for an unknown session
async fn swipe(
    State(state): State<AppState>,
    payload: Result<Json<SwipeRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload?;

    let raw_session_id = request
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("session_id is required".to_string()))?;

    let song_data = request
        .song_data
        .ok_or_else(|| AppError::BadRequest("song_data is required".to_string()))?;

    let song = song_data
        .to_new_song()
        .ok_or_else(|| AppError::BadRequest("song_data.spotify_id is required".to_string()))?;

    let direction: SwipeDirection = request
        .direction
        .ok_or_else(|| AppError::BadRequest("direction is required".to_string()))?
        .parse()
        .map_err(AppError::BadRequest)?;

    let session_id = Uuid::parse_str(&raw_session_id)
        .map_err(|_| AppError::NotFound("Session not found".to_string()))?;

    get_session(&state.pool, session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    let song_id = ensure_song(&state.pool, &song).await?;
    let swipe = record_swipe(&state.pool, session_id, song_id, direction).await?;

    tracing::info!(
        session_id = %session_id,
        spotify_id = %song.spotify_id,
        direction = %direction,
        swipe_order = swipe.swipe_order,
        "Recorded swipe"
    );

    Ok(Json(json!({
        "status": "success",
        "swipe_id": swipe.swipe_id
    })))
}
