use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use std::{fmt, str::FromStr};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub spotify_id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub creation_date: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// True when an access token, a refresh token and an expiry are all stored.
    pub fn has_stored_tokens(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some() && self.token_expires_at.is_some()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Song {
    pub song_id: Uuid,
    pub spotify_id: String,
    pub title: String,
    pub artist: String,
    pub preview_url: Option<String>,
    pub album_cover: String,
    pub popularity: i64,
    pub last_updated: DateTime<Utc>,
}

/// Song fields after default-filling, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSong {
    pub spotify_id: String,
    pub title: String,
    pub artist: String,
    pub preview_url: Option<String>,
    pub album_cover: String,
    pub popularity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SwipeDirection {
    Left,
    Right,
}

impl fmt::Display for SwipeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwipeDirection::Left => f.write_str("LEFT"),
            SwipeDirection::Right => f.write_str("RIGHT"),
        }
    }
}

impl FromStr for SwipeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LEFT" => Ok(SwipeDirection::Left),
            "RIGHT" => Ok(SwipeDirection::Right),
            other => Err(format!("Invalid swipe direction: {}", other)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SwipeSession {
    pub session_id: Uuid,
    pub spotify_id: String,
    pub target_playlist_length: i64,
    pub session_preferences: Json<serde_json::Value>,
    pub session_status: SessionStatus,
    pub creation_date: DateTime<Utc>,
    pub completion_date: Option<DateTime<Utc>>,
}

/// A session with its swipe counts, as listed for a user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub spotify_id: String,
    pub target_playlist_length: i64,
    pub session_preferences: Json<serde_json::Value>,
    pub session_status: SessionStatus,
    pub creation_date: DateTime<Utc>,
    pub completion_date: Option<DateTime<Utc>>,
    pub total_swipes: i64,
    pub liked_count: i64,
    pub passed_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize)]
pub struct SessionStats {
    pub target_playlist_length: i64,
    pub liked_count: i64,
    pub total_swipes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionProgress {
    pub session_id: Uuid,
    pub session_status: SessionStatus,
    pub target_playlist_length: i64,
    pub liked_count: i64,
    pub total_swipes: i64,
    /// liked / target * 100; values above 100 mean the target was exceeded
    pub progress_percentage: f64,
    pub is_complete: bool,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Swipe {
    pub swipe_id: Uuid,
    pub session_id: Uuid,
    pub song_id: Uuid,
    pub direction: SwipeDirection,
    pub swipe_order: i64,
    pub swipe_timestamp: DateTime<Utc>,
}

/// A swiped song joined with the swipe that recorded it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionSong {
    pub song_id: Uuid,
    pub spotify_id: String,
    pub title: String,
    pub artist: String,
    pub preview_url: Option<String>,
    pub album_cover: String,
    pub popularity: i64,
    pub direction: SwipeDirection,
    pub swipe_order: i64,
    pub swipe_timestamp: DateTime<Utc>,
    pub is_liked: bool,
    pub is_passed: bool,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Playlist {
    pub playlist_id: Uuid,
    pub spotify_id: String,
    pub spotify_playlist_id: String,
    pub name: String,
    pub description: String,
    pub creation_date: DateTime<Utc>,
}
