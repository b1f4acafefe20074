//! Candidate tracks for the swipe deck.
//!
//! One search per genre at a random offset, a single OR-combined fallback
//! search when that finds nothing, then dedupe, shuffle and preview
//! enrichment. Preview failures never fail the request.

use crate::db::models::NewSong;
use crate::error::AppError;
use crate::preview::PreviewLookup;
use crate::spotify::client::SpotifyClient;
use crate::spotify::models::{SpotifyTrack, UNKNOWN_ARTIST, UNKNOWN_TITLE};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use uuid::Uuid;

pub const DEFAULT_GENRE: &str = "pop";
pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 50;
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Probability that a genre search starts in the first 200 results.
const SHALLOW_OFFSET_PROBABILITY: f64 = 0.65;

/// Searches the provider's track catalog.
pub trait TrackSearch {
    fn search_tracks(
        &self,
        query: &str,
        offset: u32,
    ) -> impl Future<Output = Result<Vec<SpotifyTrack>, AppError>> + Send;
}

/// Catalog search with an application (client-credentials) token.
pub struct AppCatalog<'a> {
    pub client: &'a SpotifyClient,
    pub access_token: String,
}

impl TrackSearch for AppCatalog<'_> {
    async fn search_tracks(&self, query: &str, offset: u32) -> Result<Vec<SpotifyTrack>, AppError> {
        self.client
            .search_tracks(&self.access_token, query, offset)
            .await
    }
}

/// A track as served to the swipe UI.
#[derive(Debug, Clone, Serialize)]
pub struct TrackCard {
    pub id: Uuid,
    pub spotify_id: String,
    pub name: String,
    pub artist: String,
    #[serde(rename = "previewUrl")]
    pub preview_url: Option<String>,
    pub image_url: String,
    pub uri: String,
    pub popularity: i64,
    pub album: String,
    pub release_date: Option<String>,
    pub external_url: String,
    #[serde(rename = "isExplicit")]
    pub is_explicit: bool,
}

impl TrackCard {
    fn from_track(track: SpotifyTrack, preview_url: Option<String>) -> Self {
        let artist = track
            .first_artist()
            .unwrap_or(UNKNOWN_ARTIST)
            .to_string();
        let album = track.album.unwrap_or_default();

        TrackCard {
            id: Uuid::new_v4(),
            spotify_id: track.id.unwrap_or_default(),
            name: track.name.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artist,
            preview_url,
            image_url: album.cover_url().unwrap_or_default().to_string(),
            uri: track.uri.unwrap_or_default(),
            popularity: track.popularity.unwrap_or(0),
            album: album.name.unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            release_date: album.release_date,
            external_url: track.external_urls.spotify.unwrap_or_default(),
            is_explicit: track.explicit,
        }
    }
}

impl From<&TrackCard> for NewSong {
    fn from(card: &TrackCard) -> Self {
        NewSong {
            spotify_id: card.spotify_id.clone(),
            title: card.name.clone(),
            artist: card.artist.clone(),
            preview_url: card.preview_url.clone(),
            album_cover: card.image_url.clone(),
            popularity: card.popularity,
        }
    }
}

/// Split a comma-separated genre list, dropping blanks. Defaults to `pop`.
pub fn parse_genres(raw: Option<&str>) -> Vec<String> {
    let genres: Vec<String> = raw
        .unwrap_or(DEFAULT_GENRE)
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect();

    if genres.is_empty() {
        vec![DEFAULT_GENRE.to_string()]
    } else {
        genres
    }
}

/// Random search offset skewed toward the first 200 results.
pub fn random_offset<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    if rng.gen_bool(SHALLOW_OFFSET_PROBABILITY) {
        rng.gen_range(0..200)
    } else {
        rng.gen_range(200..400)
    }
}

/// Collect up to `limit` fresh tracks for `genres`, enriched with previews.
///
/// Tracks without an ID, name or artist, and tracks in `seen`, are skipped.
///
/// # Errors
/// `BadRequest` when neither the genre searches nor the fallback search
/// produced a single usable track.
pub async fn fetch_tracks<S, P, R>(
    search: &S,
    previews: &P,
    genres: &[String],
    limit: usize,
    seen: &HashSet<String>,
    rng: &mut R,
) -> Result<Vec<TrackCard>, AppError>
where
    S: TrackSearch,
    P: PreviewLookup,
    R: Rng,
{
    let mut collected = Vec::new();
    let mut collected_ids = HashSet::new();

    for genre in genres {
        let offset = random_offset(rng);
        let query = format!("genre:\"{}\"", genre);

        match search.search_tracks(&query, offset).await {
            Ok(tracks) => {
                tracing::debug!(genre = %genre, offset, count = tracks.len(), "Genre search returned tracks");
                keep_fresh(tracks, seen, &mut collected_ids, &mut collected);
            }
            Err(e) => {
                tracing::warn!(genre = %genre, error = %e, "Genre search failed, skipping genre");
            }
        }
    }

    if collected.is_empty() {
        let query = genres.join(" OR ");
        tracing::info!(query = %query, "No tracks from genre search, trying fallback");

        match search.search_tracks(&query, 0).await {
            Ok(tracks) => keep_fresh(tracks, seen, &mut collected_ids, &mut collected),
            Err(e) => tracing::warn!(error = %e, "Fallback search failed"),
        }
    }

    if collected.is_empty() {
        return Err(AppError::BadRequest(format!(
            "No songs found for genres: {}",
            genres.join(", ")
        )));
    }

    collected.shuffle(rng);
    collected.truncate(limit);

    let mut cards = Vec::with_capacity(collected.len());
    for track in collected {
        let preview_url = lookup_preview(previews, &track).await;
        cards.push(TrackCard::from_track(track, preview_url));
    }

    tracing::info!(returned = cards.len(), "Fetched tracks for swipe deck");
    Ok(cards)
}

fn keep_fresh(
    tracks: Vec<SpotifyTrack>,
    seen: &HashSet<String>,
    collected_ids: &mut HashSet<String>,
    collected: &mut Vec<SpotifyTrack>,
) {
    for track in tracks {
        if !track.is_playable() {
            continue;
        }
        let Some(id) = track.id.clone() else { continue };
        if seen.contains(&id) || !collected_ids.insert(id) {
            continue;
        }
        collected.push(track);
    }
}

async fn lookup_preview<P: PreviewLookup>(previews: &P, track: &SpotifyTrack) -> Option<String> {
    let title = track.name.as_deref()?;
    let artist = track.first_artist()?;

    match previews.preview_url(title, artist).await {
        Ok(preview) => preview,
        Err(e) => {
            tracing::warn!(title = %title, artist = %artist, error = %e, "Preview lookup failed");
            None
        }
    }
}
