//! Publishing liked songs as a playlist on the user's Spotify account.

use crate::db::models::Playlist;
use crate::db::repository::{NewPlaylist, save_playlist};
use crate::error::AppError;
use crate::spotify::models::SpotifyPlaylist;
use crate::spotify::token::AuthorizedSpotify;
use sqlx::SqlitePool;
use std::future::Future;

/// Largest number of URIs Spotify accepts in one add-items request.
pub const MAX_TRACKS_PER_REQUEST: usize = 100;

/// User-scoped playlist calls on the provider.
pub trait PlaylistApi {
    fn create_playlist(
        &self,
        name: &str,
        description: &str,
        public: bool,
    ) -> impl Future<Output = Result<SpotifyPlaylist, AppError>> + Send;

    fn add_items(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

impl PlaylistApi for AuthorizedSpotify<'_> {
    async fn create_playlist(
        &self,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<SpotifyPlaylist, AppError> {
        self.client
            .create_playlist(&self.access_token, &self.spotify_id, name, description, public)
            .await
    }

    async fn add_items(&self, playlist_id: &str, uris: &[String]) -> Result<(), AppError> {
        self.client
            .add_playlist_items(&self.access_token, playlist_id, uris)
            .await
    }
}

/// Create the playlist on Spotify, then record it locally.
///
/// The two steps commit independently: a failed insert leaves the remote
/// playlist in place.
///
/// # Errors
/// - `AuthRequired` if Spotify rejects the creation
/// - `Database` if the local record cannot be written
pub async fn publish_playlist<A: PlaylistApi>(
    pool: &SqlitePool,
    api: &A,
    spotify_id: &str,
    name: &str,
    description: &str,
    public: bool,
) -> Result<(SpotifyPlaylist, Playlist), AppError> {
    let remote = api
        .create_playlist(name, description, public)
        .await
        .map_err(|e| {
            tracing::warn!(spotify_id = %spotify_id, error = %e, "Spotify rejected playlist creation");
            AppError::AuthRequired(e.to_string())
        })?;

    tracing::info!(
        spotify_id = %spotify_id,
        spotify_playlist_id = %remote.id,
        "Created playlist on Spotify"
    );

    let record = save_playlist(
        pool,
        NewPlaylist {
            spotify_id,
            spotify_playlist_id: &remote.id,
            name,
            description,
        },
    )
    .await?;

    Ok((remote, record))
}

/// Append tracks in batches of [`MAX_TRACKS_PER_REQUEST`], in order.
///
/// Returns the number of URIs submitted. Batches that succeeded before a
/// failure stay on the playlist.
///
/// # Errors
/// `AuthRequired` on the first rejected batch
pub async fn add_tracks<A: PlaylistApi>(
    api: &A,
    playlist_id: &str,
    uris: &[String],
) -> Result<usize, AppError> {
    for (index, batch) in uris.chunks(MAX_TRACKS_PER_REQUEST).enumerate() {
        api.add_items(playlist_id, batch).await.map_err(|e| {
            tracing::warn!(
                playlist_id = %playlist_id,
                batch = index,
                error = %e,
                "Spotify rejected playlist items"
            );
            AppError::AuthRequired(e.to_string())
        })?;
    }

    tracing::info!(playlist_id = %playlist_id, added = uris.len(), "Added tracks to playlist");
    Ok(uris.len())
}
