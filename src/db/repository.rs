use crate::db::models::{Playlist, User};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Get a user by Spotify ID.
///
/// # Returns
/// Optional User if found, None otherwise
///
/// # Errors
/// Returns error if database query fails
pub async fn get_user(pool: &SqlitePool, spotify_id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT
            spotify_id,
            display_name,
            email,
            access_token,
            refresh_token,
            token_expires_at,
            creation_date,
            last_login
        FROM users
        WHERE spotify_id = ?
        "#,
    )
    .bind(spotify_id)
    .fetch_optional(pool)
    .await
}

/// Profile and token data received at the end of a successful OAuth login.
pub struct UserLogin<'a> {
    pub spotify_id: &'a str,
    pub display_name: &'a str,
    pub email: Option<&'a str>,
    pub access_token: &'a str,
    pub refresh_token: Option<&'a str>,
    pub expires_at: DateTime<Utc>,
}

/// Insert or update a user after authentication.
///
/// Uses ON CONFLICT to refresh profile and token information. A missing
/// refresh token keeps the stored one. `last_login` is always stamped.
///
/// # Returns
/// The created or updated User record
///
/// # Errors
/// Returns error if database operation fails
pub async fn upsert_user(pool: &SqlitePool, login: UserLogin<'_>) -> Result<User, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (
            spotify_id,
            display_name,
            email,
            access_token,
            refresh_token,
            token_expires_at,
            creation_date,
            last_login
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (spotify_id)
        DO UPDATE SET
            display_name = excluded.display_name,
            email = excluded.email,
            access_token = excluded.access_token,
            refresh_token = COALESCE(excluded.refresh_token, users.refresh_token),
            token_expires_at = excluded.token_expires_at,
            last_login = excluded.last_login
        RETURNING
            spotify_id,
            display_name,
            email,
            access_token,
            refresh_token,
            token_expires_at,
            creation_date,
            last_login
        "#,
    )
    .bind(login.spotify_id)
    .bind(login.display_name)
    .bind(login.email)
    .bind(login.access_token)
    .bind(login.refresh_token)
    .bind(login.expires_at)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Update access and refresh tokens for a user.
///
/// Used when refreshing expired tokens.
///
/// # Errors
/// Returns error if:
/// - No user with the given Spotify ID exists
/// - Database update fails
pub async fn update_tokens(
    pool: &SqlitePool,
    spotify_id: &str,
    access_token: &str,
    refresh_token: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET
            access_token = ?,
            refresh_token = ?,
            token_expires_at = ?
        WHERE spotify_id = ?
        "#,
    )
    .bind(access_token)
    .bind(refresh_token)
    .bind(expires_at)
    .bind(spotify_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }

    Ok(())
}

/// Parameters for recording a playlist created on Spotify
pub struct NewPlaylist<'a> {
    pub spotify_id: &'a str,
    pub spotify_playlist_id: &'a str,
    pub name: &'a str,
    pub description: &'a str,
}

/// Record a playlist that now exists on the user's Spotify account.
///
/// # Errors
/// Returns error if the insert fails (e.g. unknown user)
pub async fn save_playlist(
    pool: &SqlitePool,
    params: NewPlaylist<'_>,
) -> Result<Playlist, sqlx::Error> {
    sqlx::query_as::<_, Playlist>(
        r#"
        INSERT INTO playlists (
            playlist_id,
            spotify_id,
            spotify_playlist_id,
            name,
            description,
            creation_date
        )
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING
            playlist_id,
            spotify_id,
            spotify_playlist_id,
            name,
            description,
            creation_date
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(params.spotify_id)
    .bind(params.spotify_playlist_id)
    .bind(params.name)
    .bind(params.description)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}
