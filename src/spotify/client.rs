//! Spotify Web API client.
//!
//! Handles:
//! - Profile lookup after login
//! - Track search for the swipe deck
//! - Playlist creation and track appends
//! - Playlist permission probing for the auth check

use crate::error::AppError;
use crate::spotify::models::{
    SearchResponse, SpotifyPlaylist, SpotifyTrack, SpotifyUser,
};
use serde::de::DeserializeOwned;
use serde_json::json;

/// Page size used for every search request (the API maximum).
pub const SEARCH_PAGE_SIZE: u32 = 50;

#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    base_url: String,
    market: String,
}

impl SpotifyClient {
    pub fn new(base_url: impl Into<String>, market: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            market: market.into(),
        }
    }

    /// Profile of the user owning `access_token`.
    pub async fn current_user(&self, access_token: &str) -> Result<SpotifyUser, AppError> {
        let url = format!("{}/me", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::SpotifyApi(format!("Failed to fetch profile: {}", e)))?;

        self.check_response_json(response).await
    }

    /// One page of track search results. Null items are dropped.
    pub async fn search_tracks(
        &self,
        access_token: &str,
        query: &str,
        offset: u32,
    ) -> Result<Vec<SpotifyTrack>, AppError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("q", query.to_string()),
                ("type", "track".to_string()),
                ("limit", SEARCH_PAGE_SIZE.to_string()),
                ("offset", offset.to_string()),
                ("market", self.market.clone()),
            ])
            .send()
            .await
            .map_err(|e| AppError::SpotifyApi(format!("Search request failed: {}", e)))?;

        let results: SearchResponse = self.check_response_json(response).await?;

        Ok(results
            .tracks
            .map(|page| page.items.into_iter().flatten().collect())
            .unwrap_or_default())
    }

    pub async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<SpotifyPlaylist, AppError> {
        let url = format!("{}/users/{}/playlists", self.base_url, user_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&json!({
                "name": name,
                "description": description,
                "public": public,
            }))
            .send()
            .await
            .map_err(|e| AppError::SpotifyApi(format!("Playlist creation failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Append up to 100 track URIs to a playlist.
    pub async fn add_playlist_items(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), AppError> {
        let url = format!("{}/playlists/{}/tracks", self.base_url, playlist_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&json!({ "uris": uris }))
            .send()
            .await
            .map_err(|e| AppError::SpotifyApi(format!("Adding playlist items failed: {}", e)))?;

        self.check_response(response).await?;
        Ok(())
    }

    /// Read one of the user's playlists to confirm the token has playlist access.
    pub async fn probe_playlist_access(&self, access_token: &str) -> Result<(), AppError> {
        let url = format!("{}/me/playlists", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("limit", "1")])
            .send()
            .await
            .map_err(|e| AppError::SpotifyApi(format!("Playlist probe failed: {}", e)))?;

        self.check_response(response).await?;
        Ok(())
    }

    async fn check_response(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %body, "Spotify API returned error");
        Err(AppError::SpotifyApi(format!("{}: {}", status, body)))
    }

    async fn check_response_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        self.check_response(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| AppError::SpotifyApi(format!("Failed to parse response: {}", e)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, Method, StatusCode, Uri, header},
    };
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    /// A request as seen by the stub upstream.
    #[derive(Debug, Clone)]
    pub(crate) struct RecordedRequest {
        pub method: Method,
        pub path: String,
        pub params: Vec<(String, String)>,
        pub authorization: Option<String>,
        pub body: String,
    }

    impl RecordedRequest {
        pub fn param(&self, key: &str) -> Option<&str> {
            self.params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        }

        pub fn json(&self) -> Value {
            serde_json::from_str(&self.body).unwrap()
        }
    }

    pub(crate) type Responder = fn(&RecordedRequest) -> (StatusCode, Value);

    #[derive(Clone)]
    struct Upstream {
        log: Arc<Mutex<Vec<RecordedRequest>>>,
        respond: Responder,
    }

    async fn record(
        State(upstream): State<Upstream>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: String,
    ) -> (StatusCode, Json<Value>) {
        let params = reqwest::Url::parse(&format!("http://stub{}", uri))
            .map(|url| url.query_pairs().into_owned().collect())
            .unwrap_or_default();

        let request = RecordedRequest {
            method,
            path: uri.path().to_string(),
            params,
            authorization: headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body,
        };

        let (status, reply) = (upstream.respond)(&request);
        upstream.log.lock().unwrap().push(request);
        (status, Json(reply))
    }

    /// Serve `respond` on a local port; returns the base URL and the request log.
    pub(crate) async fn spawn_upstream(
        respond: Responder,
    ) -> (String, Arc<Mutex<Vec<RecordedRequest>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(record).with_state(Upstream {
            log: log.clone(),
            respond,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        (format!("http://{}", addr), log)
    }

    fn spotify_stub(request: &RecordedRequest) -> (StatusCode, Value) {
        match request.path.as_str() {
            "/v1/search" => (
                StatusCode::OK,
                json!({
                    "tracks": {
                        "items": [
                            null,
                            { "id": "t1", "name": "Song", "artists": [{ "name": "Band" }] }
                        ]
                    }
                }),
            ),
            "/v1/users/listener/playlists" => (
                StatusCode::CREATED,
                json!({
                    "id": "pl1",
                    "external_urls": { "spotify": "https://open.spotify.com/playlist/pl1" }
                }),
            ),
            "/v1/playlists/pl1/tracks" => (StatusCode::CREATED, json!({ "snapshot_id": "s1" })),
            _ => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": { "status": 401, "message": "Invalid access token" } }),
            ),
        }
    }

    #[tokio::test]
    async fn test_search_request_shape() {
        let (base, log) = spawn_upstream(spotify_stub).await;
        let client = SpotifyClient::new(format!("{}/v1/", base), "US");

        let tracks = client
            .search_tracks("app-token", "genre:\"hip hop\"", 150)
            .await
            .unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id.as_deref(), Some("t1"));

        let requests = log.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/v1/search");
        assert_eq!(request.authorization.as_deref(), Some("Bearer app-token"));
        assert_eq!(request.param("q"), Some("genre:\"hip hop\""));
        assert_eq!(request.param("type"), Some("track"));
        assert_eq!(request.param("limit"), Some("50"));
        assert_eq!(request.param("offset"), Some("150"));
        assert_eq!(request.param("market"), Some("US"));
    }

    #[tokio::test]
    async fn test_playlist_request_shapes() {
        let (base, log) = spawn_upstream(spotify_stub).await;
        let client = SpotifyClient::new(format!("{}/v1", base), "US");

        let playlist = client
            .create_playlist("user-token", "listener", "Road Trip", "Swiped", false)
            .await
            .unwrap();
        assert_eq!(playlist.id, "pl1");
        assert_eq!(
            playlist.external_urls.spotify.as_deref(),
            Some("https://open.spotify.com/playlist/pl1")
        );

        let uris = vec![
            "spotify:track:aaa".to_string(),
            "spotify:track:bbb".to_string(),
        ];
        client
            .add_playlist_items("user-token", "pl1", &uris)
            .await
            .unwrap();

        let requests = log.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].path, "/v1/users/listener/playlists");
        assert_eq!(
            requests[0].json(),
            json!({ "name": "Road Trip", "description": "Swiped", "public": false })
        );

        assert_eq!(requests[1].method, Method::POST);
        assert_eq!(requests[1].path, "/v1/playlists/pl1/tracks");
        assert_eq!(requests[1].authorization.as_deref(), Some("Bearer user-token"));
        assert_eq!(
            requests[1].json(),
            json!({ "uris": ["spotify:track:aaa", "spotify:track:bbb"] })
        );
    }

    #[tokio::test]
    async fn test_error_status_is_spotify_error() {
        let (base, log) = spawn_upstream(spotify_stub).await;
        let client = SpotifyClient::new(format!("{}/v1", base), "US");

        let result = client.probe_playlist_access("stale-token").await;

        match result {
            Err(AppError::SpotifyApi(message)) => assert!(message.contains("401")),
            other => panic!("expected SpotifyApi error, got {:?}", other.map(|_| ())),
        }

        let requests = log.lock().unwrap().clone();
        assert_eq!(requests[0].path, "/v1/me/playlists");
        assert_eq!(requests[0].param("limit"), Some("1"));
    }
}
