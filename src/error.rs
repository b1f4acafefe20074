use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application-specific errors with HTTP status code mappings
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("OAuth state not found")]
    OAuthStateNotFound,

    #[error("OAuth state expired")]
    OAuthStateExpired,

    #[error("Spotify API error: {0}")]
    SpotifyApi(String),

    #[error("Preview API error: {0}")]
    PreviewApi(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::OAuthStateNotFound | AppError::OAuthStateExpired => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) | AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::AuthRequired(_) => StatusCode::UNAUTHORIZED,
            AppError::SpotifyApi(_) | AppError::PreviewApi(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the client should send the user through the OAuth flow again
    pub fn needs_auth(&self) -> bool {
        matches!(self, AppError::AuthRequired(_) | AppError::UserNotFound)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                msg.clone()
            }
            AppError::NotFound(msg) => {
                tracing::warn!("Not found: {}", msg);
                msg.clone()
            }
            AppError::UserNotFound => {
                tracing::warn!("User not found");
                "User not found".to_string()
            }
            AppError::AuthRequired(reason) => {
                tracing::warn!(reason = %reason, "Spotify authentication required");
                "Authentication required. Please sign in again.".to_string()
            }
            AppError::OAuthStateNotFound => {
                tracing::warn!("OAuth state not found");
                "Invalid or expired OAuth state".to_string()
            }
            AppError::OAuthStateExpired => {
                tracing::warn!("OAuth state expired");
                "OAuth state expired, please try again".to_string()
            }
            AppError::SpotifyApi(msg) => {
                tracing::error!("Spotify API error: {}", msg);
                "Spotify API error".to_string()
            }
            AppError::PreviewApi(msg) => {
                tracing::error!("Preview API error: {}", msg);
                "Preview API error".to_string()
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                "Internal server error".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                "Internal server error".to_string()
            }
        };

        let body = if self.needs_auth() {
            json!({ "status": "error", "message": message, "needs_auth": true })
        } else {
            json!({ "status": "error", "message": message })
        };

        (self.status_code(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(format!("Invalid query string: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_bad_request_exposes_message() {
        let (status, body) = body_json(AppError::BadRequest("Spotify ID is required".into())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Spotify ID is required");
        assert!(body.get("needs_auth").is_none());
    }

    #[tokio::test]
    async fn test_auth_required_hides_provider_error() {
        let (status, body) =
            body_json(AppError::AuthRequired("invalid_grant: refresh token revoked".into())).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["needs_auth"], true);
        assert_eq!(
            body["message"],
            "Authentication required. Please sign in again."
        );
    }

    #[tokio::test]
    async fn test_user_not_found_needs_auth() {
        let (status, body) = body_json(AppError::UserNotFound).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["needs_auth"], true);
    }

    #[tokio::test]
    async fn test_database_error_is_opaque() {
        let (status, body) = body_json(AppError::Database(sqlx::Error::RowNotFound)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn test_upstream_errors_map_to_bad_gateway() {
        assert_eq!(
            AppError::SpotifyApi("boom".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::PreviewApi("boom".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
