//! Swipe session endpoints.

use crate::AppState;
use crate::db::repository::get_user;
use crate::db::sessions::{
    complete_session, create_session, get_session_progress, get_session_songs,
    list_user_sessions,
};
use crate::error::AppError;
use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/swipe_sessions",
            post(create_swipe_session).get(list_swipe_sessions),
        )
        .route("/api/session_progress/{session_id}", get(session_progress))
        .route("/api/complete_session/{session_id}", post(complete))
        .route("/api/session_songs/{session_id}", get(session_songs))
}

fn session_not_found() -> AppError {
    AppError::NotFound("Session not found".to_string())
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub spotify_id: Option<String>,
    pub target_playlist_length: Option<i64>,
    pub session_preferences: Option<Value>,
}

/// Start a new ACTIVE session for a user.
///
/// # Endpoint
/// POST /api/swipe_sessions
///
/// `target_playlist_length` defaults to the configured length and
/// `session_preferences` to `{}`; preferences are stored as given.
async fn create_swipe_session(
    State(state): State<AppState>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload?;

    let spotify_id = request
        .spotify_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Spotify ID is required".to_string()))?;

    let target = request
        .target_playlist_length
        .unwrap_or(state.config.default_target_length);
    if target <= 0 {
        return Err(AppError::BadRequest(
            "target_playlist_length must be positive".to_string(),
        ));
    }

    get_user(&state.pool, &spotify_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let preferences = request
        .session_preferences
        .filter(|p| !p.is_null())
        .unwrap_or_else(|| json!({}));

    let session = create_session(&state.pool, &spotify_id, target, &preferences).await?;

    tracing::info!(
        session_id = %session.session_id,
        spotify_id = %spotify_id,
        target_playlist_length = target,
        "Created swipe session"
    );

    Ok(Json(json!({
        "status": "success",
        "data": {
            "session_id": session.session_id,
            "spotify_id": session.spotify_id,
            "target_playlist_length": session.target_playlist_length
        },
        "message": "Swipe session created successfully"
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub spotify_id: Option<String>,
}

async fn list_swipe_sessions(
    State(state): State<AppState>,
    query: Result<Query<ListSessionsQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = query?;

    let spotify_id = params
        .spotify_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Spotify ID is required".to_string()))?;

    let sessions = list_user_sessions(&state.pool, &spotify_id).await?;

    Ok(Json(json!({
        "status": "success",
        "total": sessions.len(),
        "sessions": sessions
    })))
}

async fn session_progress(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let session_id = Uuid::parse_str(&session_id).map_err(|_| session_not_found())?;

    let progress = get_session_progress(&state.pool, session_id)
        .await?
        .ok_or_else(session_not_found)?;

    Ok(Json(json!({
        "status": "success",
        "data": progress
    })))
}

/// Mark a session COMPLETED. Safe to call repeatedly.
///
/// # Endpoint
/// POST /api/complete_session/{session_id}
async fn complete(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let session_id = Uuid::parse_str(&session_id).map_err(|_| session_not_found())?;

    let stats = complete_session(&state.pool, session_id)
        .await?
        .ok_or_else(session_not_found)?;

    Ok(Json(json!({
        "status": "success",
        "message": "Session completed successfully",
        "data": {
            "session_id": session_id,
            "stats": stats
        }
    })))
}

/// Songs swiped in a session, in swipe order. Unknown sessions have none.
async fn session_songs(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let songs = match Uuid::parse_str(&session_id) {
        Ok(session_id) => get_session_songs(&state.pool, session_id).await?,
        Err(_) => Vec::new(),
    };

    Ok(Json(json!({
        "status": "success",
        "total": songs.len(),
        "songs": songs
    })))
}
