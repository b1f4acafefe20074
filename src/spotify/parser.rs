use regex::Regex;
use std::sync::LazyLock;

static TRACK_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://open\.spotify\.com/(?:intl-[a-z]{2}/)?track/([a-zA-Z0-9]+)(?:[?#/].*)?$")
        .expect("valid track URL pattern")
});

static TRACK_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^spotify:track:([a-zA-Z0-9]+)$").expect("valid track URI pattern"));

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]{10,}$").expect("valid track ID pattern"));

/// Extract a Spotify track ID from a URI, an open.spotify.com link or a bare ID.
///
/// # Examples
/// ```
/// use tuneswipe::spotify::parser::extract_track_id;
///
/// let url = "https://open.spotify.com/track/3n3Ppam7vgaVa1iaRUc9Lp?si=abc";
/// assert_eq!(extract_track_id(url), Some("3n3Ppam7vgaVa1iaRUc9Lp".to_string()));
/// ```
pub fn extract_track_id(text: &str) -> Option<String> {
    let text = text.trim();

    if let Some(captures) = TRACK_URI.captures(text) {
        return Some(captures[1].to_string());
    }

    if let Some(captures) = TRACK_URL.captures(text) {
        return Some(captures[1].to_string());
    }

    BARE_ID.is_match(text).then(|| text.to_string())
}

/// Normalize a client-supplied track reference to `spotify:track:<id>`.
pub fn normalize_track_uri(text: &str) -> Option<String> {
    extract_track_id(text).map(|id| format!("spotify:track:{}", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_track_id_https_url() {
        let url = "https://open.spotify.com/track/3n3Ppam7vgaVa1iaRUc9Lp";
        assert_eq!(
            extract_track_id(url),
            Some("3n3Ppam7vgaVa1iaRUc9Lp".to_string())
        );
    }

    #[test]
    fn test_extract_track_id_url_with_query() {
        let url = "https://open.spotify.com/track/3n3Ppam7vgaVa1iaRUc9Lp?si=abc123def456";
        assert_eq!(
            extract_track_id(url),
            Some("3n3Ppam7vgaVa1iaRUc9Lp".to_string())
        );
    }

    #[test]
    fn test_extract_track_id_localized_url() {
        let url = "https://open.spotify.com/intl-de/track/3n3Ppam7vgaVa1iaRUc9Lp";
        assert_eq!(
            extract_track_id(url),
            Some("3n3Ppam7vgaVa1iaRUc9Lp".to_string())
        );
    }

    #[test]
    fn test_extract_track_id_spotify_uri() {
        let uri = "spotify:track:3n3Ppam7vgaVa1iaRUc9Lp";
        assert_eq!(
            extract_track_id(uri),
            Some("3n3Ppam7vgaVa1iaRUc9Lp".to_string())
        );
    }

    #[test]
    fn test_extract_track_id_bare_id() {
        assert_eq!(
            extract_track_id(" 3n3Ppam7vgaVa1iaRUc9Lp "),
            Some("3n3Ppam7vgaVa1iaRUc9Lp".to_string())
        );
    }

    #[test]
    fn test_rejects_other_resources() {
        assert_eq!(
            extract_track_id("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M"),
            None
        );
        assert_eq!(extract_track_id("spotify:album:37i9dQZF1DXcBWIGoYBM5M"), None);
    }

    #[test]
    fn test_rejects_free_text() {
        assert_eq!(extract_track_id("No Spotify links here"), None);
        assert_eq!(extract_track_id(""), None);
        assert_eq!(extract_track_id("short"), None);
    }

    #[test]
    fn test_normalize_track_uri() {
        assert_eq!(
            normalize_track_uri("https://open.spotify.com/track/3n3Ppam7vgaVa1iaRUc9Lp"),
            Some("spotify:track:3n3Ppam7vgaVa1iaRUc9Lp".to_string())
        );
        assert_eq!(
            normalize_track_uri("spotify:track:3n3Ppam7vgaVa1iaRUc9Lp"),
            Some("spotify:track:3n3Ppam7vgaVa1iaRUc9Lp".to_string())
        );
        assert_eq!(normalize_track_uri("spotify:episode:xyz"), None);
    }
}
