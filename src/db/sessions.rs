//! Swipe session bookkeeping: sessions, the songs shown in them, and the swipe log.
//!
//! Every function runs its statements directly on the pool, so multi-step
//! flows (song then swipe) commit step by step.

use crate::db::models::{
    NewSong, SessionProgress, SessionSong, SessionStats, SessionStatus, SessionSummary, Swipe,
    SwipeDirection, SwipeSession,
};
use chrono::Utc;
use sqlx::{SqlitePool, types::Json};
use std::collections::HashSet;
use uuid::Uuid;

/// Create a new ACTIVE session for a user.
///
/// The preference payload is stored verbatim.
pub async fn create_session(
    pool: &SqlitePool,
    spotify_id: &str,
    target_playlist_length: i64,
    preferences: &serde_json::Value,
) -> Result<SwipeSession, sqlx::Error> {
    sqlx::query_as::<_, SwipeSession>(
        r#"
        INSERT INTO swipe_sessions (
            session_id,
            spotify_id,
            target_playlist_length,
            session_preferences,
            session_status,
            creation_date
        )
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING
            session_id,
            spotify_id,
            target_playlist_length,
            session_preferences,
            session_status,
            creation_date,
            completion_date
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(spotify_id)
    .bind(target_playlist_length)
    .bind(Json(preferences))
    .bind(SessionStatus::Active)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn get_session(
    pool: &SqlitePool,
    session_id: Uuid,
) -> Result<Option<SwipeSession>, sqlx::Error> {
    sqlx::query_as::<_, SwipeSession>(
        r#"
        SELECT
            session_id,
            spotify_id,
            target_playlist_length,
            session_preferences,
            session_status,
            creation_date,
            completion_date
        FROM swipe_sessions
        WHERE session_id = ?
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await
}

/// All sessions of a user with swipe counts, newest first.
pub async fn list_user_sessions(
    pool: &SqlitePool,
    spotify_id: &str,
) -> Result<Vec<SessionSummary>, sqlx::Error> {
    sqlx::query_as::<_, SessionSummary>(
        r#"
        SELECT
            ss.session_id AS session_id,
            ss.spotify_id AS spotify_id,
            ss.target_playlist_length AS target_playlist_length,
            ss.session_preferences AS session_preferences,
            ss.session_status AS session_status,
            ss.creation_date AS creation_date,
            ss.completion_date AS completion_date,
            COUNT(sw.swipe_id) AS total_swipes,
            COUNT(CASE WHEN sw.direction = 'RIGHT' THEN 1 END) AS liked_count,
            COUNT(CASE WHEN sw.direction = 'LEFT' THEN 1 END) AS passed_count
        FROM swipe_sessions ss
        LEFT JOIN swipes sw ON sw.session_id = ss.session_id
        WHERE ss.spotify_id = ?
        GROUP BY ss.session_id
        ORDER BY ss.creation_date DESC
        "#,
    )
    .bind(spotify_id)
    .fetch_all(pool)
    .await
}

/// Insert a song unless one with the same Spotify track ID exists.
///
/// # Returns
/// The database ID of the new or existing song
pub async fn ensure_song(pool: &SqlitePool, song: &NewSong) -> Result<Uuid, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO songs (
            song_id,
            spotify_id,
            title,
            artist,
            preview_url,
            album_cover,
            popularity,
            last_updated
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (spotify_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&song.spotify_id)
    .bind(&song.title)
    .bind(&song.artist)
    .bind(&song.preview_url)
    .bind(&song.album_cover)
    .bind(song.popularity)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    sqlx::query_scalar::<_, Uuid>("SELECT song_id FROM songs WHERE spotify_id = ?")
        .bind(&song.spotify_id)
        .fetch_one(pool)
        .await
}

/// Append a swipe to the session log.
///
/// The order is `MAX(swipe_order) + 1` for the session, starting at 1. It is
/// computed inside the INSERT so SQLite evaluates it under the write lock.
pub async fn record_swipe(
    pool: &SqlitePool,
    session_id: Uuid,
    song_id: Uuid,
    direction: SwipeDirection,
) -> Result<Swipe, sqlx::Error> {
    sqlx::query_as::<_, Swipe>(
        r#"
        INSERT INTO swipes (
            swipe_id,
            session_id,
            song_id,
            direction,
            swipe_order,
            swipe_timestamp
        )
        SELECT ?, ?, ?, ?, COALESCE(MAX(swipe_order), 0) + 1, ?
        FROM swipes
        WHERE session_id = ?
        RETURNING
            swipe_id,
            session_id,
            song_id,
            direction,
            swipe_order,
            swipe_timestamp
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(song_id)
    .bind(direction)
    .bind(Utc::now())
    .bind(session_id)
    .fetch_one(pool)
    .await
}

async fn session_stats(
    pool: &SqlitePool,
    session_id: Uuid,
) -> Result<Option<SessionStats>, sqlx::Error> {
    sqlx::query_as::<_, SessionStats>(
        r#"
        SELECT
            ss.target_playlist_length AS target_playlist_length,
            COUNT(CASE WHEN sw.direction = 'RIGHT' THEN 1 END) AS liked_count,
            COUNT(sw.swipe_id) AS total_swipes
        FROM swipe_sessions ss
        LEFT JOIN swipes sw ON sw.session_id = ss.session_id
        WHERE ss.session_id = ?
        GROUP BY ss.session_id
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await
}

impl SessionProgress {
    pub fn from_stats(session_id: Uuid, status: SessionStatus, stats: SessionStats) -> Self {
        let progress_percentage =
            stats.liked_count as f64 / stats.target_playlist_length as f64 * 100.0;

        SessionProgress {
            session_id,
            session_status: status,
            target_playlist_length: stats.target_playlist_length,
            liked_count: stats.liked_count,
            total_swipes: stats.total_swipes,
            progress_percentage,
            is_complete: stats.liked_count >= stats.target_playlist_length,
        }
    }
}

/// Liked/total counts against the target. `None` if the session does not exist.
pub async fn get_session_progress(
    pool: &SqlitePool,
    session_id: Uuid,
) -> Result<Option<SessionProgress>, sqlx::Error> {
    let Some(session) = get_session(pool, session_id).await? else {
        return Ok(None);
    };

    Ok(session_stats(pool, session_id)
        .await?
        .map(|stats| SessionProgress::from_stats(session_id, session.session_status, stats)))
}

/// Mark a session COMPLETED and return its stats.
///
/// Only an ACTIVE session transitions; calling this again leaves status and
/// completion date untouched and returns the same stats. `None` if the
/// session does not exist.
pub async fn complete_session(
    pool: &SqlitePool,
    session_id: Uuid,
) -> Result<Option<SessionStats>, sqlx::Error> {
    let Some(session) = get_session(pool, session_id).await? else {
        return Ok(None);
    };

    if session.session_status == SessionStatus::Active {
        let result = sqlx::query(
            r#"
            UPDATE swipe_sessions
            SET session_status = ?, completion_date = ?
            WHERE session_id = ? AND session_status = ?
            "#,
        )
        .bind(SessionStatus::Completed)
        .bind(Utc::now())
        .bind(session_id)
        .bind(SessionStatus::Active)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(session_id = %session_id, "Session marked as completed");
        }
    } else {
        tracing::debug!(
            session_id = %session_id,
            status = ?session.session_status,
            "Session already finished, returning stats only"
        );
    }

    session_stats(pool, session_id).await
}

/// Spotify track IDs already swiped in a session.
pub async fn session_seen_track_ids(
    pool: &SqlitePool,
    session_id: Uuid,
) -> Result<HashSet<String>, sqlx::Error> {
    let ids = sqlx::query_scalar::<_, String>(
        r#"
        SELECT DISTINCT s.spotify_id
        FROM songs s
        JOIN swipes sw ON sw.song_id = s.song_id
        WHERE sw.session_id = ?
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(ids.into_iter().collect())
}

/// Songs swiped in a session, in swipe order.
pub async fn get_session_songs(
    pool: &SqlitePool,
    session_id: Uuid,
) -> Result<Vec<SessionSong>, sqlx::Error> {
    sqlx::query_as::<_, SessionSong>(
        r#"
        SELECT
            s.song_id AS song_id,
            s.spotify_id AS spotify_id,
            s.title AS title,
            s.artist AS artist,
            s.preview_url AS preview_url,
            s.album_cover AS album_cover,
            s.popularity AS popularity,
            sw.direction AS direction,
            sw.swipe_order AS swipe_order,
            sw.swipe_timestamp AS swipe_timestamp,
            sw.direction = 'RIGHT' AS is_liked,
            sw.direction = 'LEFT' AS is_passed
        FROM swipes sw
        JOIN songs s ON s.song_id = sw.song_id
        WHERE sw.session_id = ?
        ORDER BY sw.swipe_order ASC, sw.swipe_timestamp ASC
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await
}
