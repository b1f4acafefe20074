pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod playlist;
pub mod preview;
pub mod routes;
pub mod spotify;
pub mod telemetry;

use crate::config::Config;
use crate::preview::DeezerClient;
use crate::spotify::client::SpotifyClient;
use crate::spotify::oauth::{StateStore, build_oauth_client, new_state_store};
use oauth2::basic::BasicClient;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
    pub oauth_client: BasicClient,
    pub state_store: StateStore,
    pub spotify: SpotifyClient,
    pub previews: DeezerClient,
}

impl AppState {
    pub fn new(config: Config, pool: SqlitePool) -> anyhow::Result<Self> {
        let oauth_client = build_oauth_client(&config)?;
        let spotify = SpotifyClient::new(&config.spotify_api_base, &config.spotify_market);
        let previews = DeezerClient::new(&config.deezer_api_base);

        Ok(Self {
            config: Arc::new(config),
            pool,
            oauth_client,
            state_store: new_state_store(),
            spotify,
            previews,
        })
    }
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    telemetry::init_tracing(&config.rust_log, &config.rust_log_format);

    let pool = db::init_pool(&config.database_url).await?;
    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState::new(config, pool)?;
    let app = routes::create_router(state);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
