// Integration tests for tuneswipe
//
// These drive the full router against a fresh, migrated SQLite database per
// test. External Spotify and Deezer endpoints point at a closed local port,
// so only flows that stay inside the service are exercised end to end.
//
// Run with: cargo test --test api_test

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower::ServiceExt;
use tuneswipe::AppState;
use tuneswipe::config::Config;
use tuneswipe::db::repository::{UserLogin, upsert_user};
use tuneswipe::routes::create_router;

fn test_config() -> Config {
    Config::from_iter(
        [
            ("SPOTIFY_CLIENT_ID", "integration_client"),
            ("SPOTIFY_CLIENT_SECRET", "integration_secret"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("SPOTIFY_API_BASE", "http://127.0.0.1:9/v1"),
            ("SPOTIFY_TOKEN_URL", "http://127.0.0.1:9/api/token"),
            ("DEEZER_API_BASE", "http://127.0.0.1:9"),
            ("DEFAULT_TARGET_LENGTH", "20"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string())),
    )
    .expect("test config")
}

fn app(pool: SqlitePool) -> Router {
    create_router(AppState::new(test_config(), pool).expect("app state"))
}

async fn create_user(pool: &SqlitePool, spotify_id: &str) -> sqlx::Result<()> {
    upsert_user(
        pool,
        UserLogin {
            spotify_id,
            display_name: "Integration User",
            email: Some("integration@example.com"),
            access_token: "access",
            refresh_token: Some("refresh"),
            expires_at: Utc::now() + Duration::hours(1),
        },
    )
    .await?;
    Ok(())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    };
    app.clone().oneshot(request.unwrap()).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn swipe(app: &Router, session_id: &str, spotify_id: &str, direction: &str) -> Response {
    send(
        app,
        "POST",
        "/api/swipe",
        Some(json!({
            "session_id": session_id,
            "song_data": {
                "id": "3f1c6a0e-0000-0000-0000-000000000000",
                "spotify_id": spotify_id,
                "name": format!("Song {}", spotify_id),
                "artist": "Band",
                "previewUrl": null,
                "image_url": "",
                "album": "LP",
                "popularity": 10,
                "isExplicit": false
            },
            "direction": direction
        })),
    )
    .await
}

#[sqlx::test]
async fn test_health(pool: SqlitePool) {
    let app = app(pool);

    let response = send(&app, "GET", "/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[sqlx::test]
async fn test_auth_url(pool: SqlitePool) {
    let app = app(pool);

    let response = send(&app, "GET", "/api/spotify/auth_url", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let url = body["auth_url"].as_str().unwrap();
    assert!(url.contains("client_id=integration_client"));
    assert!(url.contains("state="));
    assert!(url.contains("show_dialog=true"));
}

#[sqlx::test]
async fn test_callback_error_redirects(pool: SqlitePool) {
    let app = app(pool);

    let response = send(&app, "GET", "/callback?error=access_denied", None).await;

    assert!(response.status().is_redirection());
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(location, "http://localhost:5173/?error=access_denied");
}

/// Target of two likes: progress, completion and a repeated completion.
#[sqlx::test]
async fn test_session_lifecycle(pool: SqlitePool) -> sqlx::Result<()> {
    create_user(&pool, "listener").await?;
    let app = app(pool);

    let response = send(
        &app,
        "POST",
        "/api/swipe_sessions",
        Some(json!({ "spotify_id": "listener", "target_playlist_length": 2 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let session_id = body["data"]["session_id"].as_str().unwrap().to_string();
    let progress_uri = format!("/api/session_progress/{}", session_id);

    let response = swipe(&app, &session_id, "track_one", "RIGHT").await;
    assert_eq!(response.status(), StatusCode::OK);

    let progress = json_body(send(&app, "GET", &progress_uri, None).await).await;
    assert_eq!(progress["data"]["liked_count"], 1);
    assert_eq!(progress["data"]["is_complete"], false);
    assert_eq!(progress["data"]["progress_percentage"], 50.0);

    let response = swipe(&app, &session_id, "track_two", "LEFT").await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = swipe(&app, &session_id, "track_three", "RIGHT").await;
    assert_eq!(response.status(), StatusCode::OK);

    let progress = json_body(send(&app, "GET", &progress_uri, None).await).await;
    assert_eq!(progress["data"]["liked_count"], 2);
    assert_eq!(progress["data"]["total_swipes"], 3);
    assert_eq!(progress["data"]["is_complete"], true);

    let complete_uri = format!("/api/complete_session/{}", session_id);
    let first = json_body(send(&app, "POST", &complete_uri, None).await).await;
    assert_eq!(first["status"], "success");
    assert_eq!(first["data"]["session_id"], session_id.as_str());
    assert_eq!(first["data"]["stats"]["liked_count"], 2);
    assert_eq!(first["data"]["stats"]["total_swipes"], 3);
    assert_eq!(first["data"]["stats"]["target_playlist_length"], 2);

    let second = json_body(send(&app, "POST", &complete_uri, None).await).await;
    assert_eq!(second["data"]["stats"], first["data"]["stats"]);

    let progress = json_body(send(&app, "GET", &progress_uri, None).await).await;
    assert_eq!(progress["data"]["session_status"], "COMPLETED");

    let sessions = json_body(
        send(&app, "GET", "/api/swipe_sessions?spotify_id=listener", None).await,
    )
    .await;
    assert_eq!(sessions["total"], 1);
    assert_eq!(sessions["sessions"][0]["liked_count"], 2);
    assert_eq!(sessions["sessions"][0]["passed_count"], 1);
    assert!(sessions["sessions"][0]["completion_date"].is_string());

    let songs = json_body(
        send(&app, "GET", &format!("/api/session_songs/{}", session_id), None).await,
    )
    .await;
    assert_eq!(songs["total"], 3);
    let orders: Vec<i64> = songs["songs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["swipe_order"].as_i64().unwrap())
        .collect();
    assert_eq!(orders, vec![1, 2, 3]);
    assert_eq!(songs["songs"][1]["spotify_id"], "track_two");
    assert_eq!(songs["songs"][1]["is_passed"], true);

    Ok(())
}

#[sqlx::test]
async fn test_swiping_same_song_twice_reuses_it(pool: SqlitePool) -> sqlx::Result<()> {
    create_user(&pool, "listener").await?;
    let app = app(pool.clone());

    let body = json_body(
        send(
            &app,
            "POST",
            "/api/swipe_sessions",
            Some(json!({ "spotify_id": "listener" })),
        )
        .await,
    )
    .await;
    let session_id = body["data"]["session_id"].as_str().unwrap().to_string();

    swipe(&app, &session_id, "repeat", "LEFT").await;
    swipe(&app, &session_id, "repeat", "RIGHT").await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE spotify_id = 'repeat'")
        .fetch_one(&pool)
        .await?;
    assert_eq!(count, 1);

    Ok(())
}

#[sqlx::test]
async fn test_error_shapes(pool: SqlitePool) {
    let app = app(pool);

    let response = send(&app, "GET", "/api/check_auth/nobody", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["needs_auth"], true);

    let response = send(
        &app,
        "POST",
        "/api/swipe_sessions",
        Some(json!({ "target_playlist_length": 3 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["message"].is_string());

    let response = send(
        &app,
        "POST",
        "/api/create_playlist",
        Some(json!({ "spotify_id": "nobody", "name": "Mix" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
