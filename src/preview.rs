//! Preview-audio lookup against Deezer's public search API.

use crate::error::AppError;
use serde::Deserialize;
use std::future::Future;

/// Finds a short audio preview for a track.
pub trait PreviewLookup {
    fn preview_url(
        &self,
        title: &str,
        artist: &str,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;
}

#[derive(Debug, Default, Deserialize)]
struct DeezerSearchResponse {
    #[serde(default)]
    data: Vec<DeezerTrack>,
}

#[derive(Debug, Deserialize)]
struct DeezerTrack {
    #[serde(default)]
    preview: Option<String>,
}

#[derive(Clone)]
pub struct DeezerClient {
    http: reqwest::Client,
    base_url: String,
}

impl DeezerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// First result's preview for `query`, or `None` when nothing matched.
    async fn search(&self, query: &str) -> Result<Option<String>, AppError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| AppError::PreviewApi(format!("Deezer search failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::PreviewApi(format!(
                "Deezer search returned {}",
                status
            )));
        }

        let body: DeezerSearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::PreviewApi(format!("Failed to parse Deezer response: {}", e)))?;

        Ok(first_preview(body))
    }
}

impl PreviewLookup for DeezerClient {
    async fn preview_url(&self, title: &str, artist: &str) -> Result<Option<String>, AppError> {
        if let Some(preview) = self.search(&exact_query(title, artist)).await? {
            return Ok(Some(preview));
        }

        tracing::debug!(title = %title, artist = %artist, "No exact Deezer match, trying loose search");
        self.search(&loose_query(title, artist)).await
    }
}

fn exact_query(title: &str, artist: &str) -> String {
    format!("track:\"{}\" artist:\"{}\"", title, artist)
}

fn loose_query(title: &str, artist: &str) -> String {
    format!("{} {}", title, artist)
}

fn first_preview(response: DeezerSearchResponse) -> Option<String> {
    response
        .data
        .into_iter()
        .next()
        .and_then(|track| track.preview)
        .filter(|p| !p.is_empty())
}
