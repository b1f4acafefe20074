use crate::db::models::NewSong;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};

/// Track object as returned by the Spotify Web API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpotifyTrack {
    pub id: Option<String>,
    pub name: Option<String>,
    pub artists: Vec<SpotifyArtist>,
    pub album: Option<SpotifyAlbum>,
    pub uri: Option<String>,
    pub popularity: Option<i64>,
    pub explicit: bool,
    pub external_urls: ExternalUrls,
    pub preview_url: Option<String>,
}

impl SpotifyTrack {
    pub fn first_artist(&self) -> Option<&str> {
        self.artists.first().and_then(|a| a.name.as_deref())
    }

    /// Usable in a swipe deck: has an ID, a title and a named first artist.
    pub fn is_playable(&self) -> bool {
        let present = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.id) && present(&self.name) && self.first_artist().is_some_and(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyArtist {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpotifyAlbum {
    pub name: Option<String>,
    pub release_date: Option<String>,
    pub images: Vec<SpotifyImage>,
}

impl SpotifyAlbum {
    pub fn cover_url(&self) -> Option<&str> {
        self.images.first().and_then(|i| i.url.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyImage {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Option<Paging<Option<SpotifyTrack>>>,
}

#[derive(Debug, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// `GET /me`
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

/// Song description posted back by the client when it swipes.
///
/// Accepts the card shape served by `get_song` as well as a raw Spotify
/// track. Optional fields that are missing or have the wrong type
/// deserialize as `None` and are default-filled by [`SongPayload::to_new_song`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub spotify_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub artists: Option<Vec<SpotifyArtist>>,
    #[serde(default, rename = "previewUrl", deserialize_with = "lenient")]
    pub preview_url_camel: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub preview_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub album: Option<AlbumField>,
    #[serde(default, deserialize_with = "lenient")]
    pub popularity: Option<i64>,
}

/// `album` is a plain name on cards and an object on Spotify tracks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AlbumField {
    Name(String),
    Object(SpotifyAlbum),
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

impl SongPayload {
    /// Fill defaults for everything but the track ID, which is returned as `None` when absent.
    pub fn to_new_song(&self) -> Option<NewSong> {
        let spotify_id = self.spotify_id.as_deref().filter(|s| !s.is_empty())?;

        let artist = self
            .artist
            .clone()
            .filter(|a| !a.is_empty())
            .or_else(|| {
                self.artists
                    .as_ref()
                    .and_then(|artists| artists.first())
                    .and_then(|a| a.name.clone())
            })
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        let album_cover = self
            .image_url
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| match &self.album {
                Some(AlbumField::Object(album)) => album.cover_url().map(str::to_string),
                _ => None,
            })
            .unwrap_or_default();

        Some(NewSong {
            spotify_id: spotify_id.to_string(),
            title: self
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artist,
            preview_url: self.preview_url_camel.clone().or_else(|| self.preview_url.clone()),
            album_cover,
            popularity: self.popularity.unwrap_or(0),
        })
    }
}
