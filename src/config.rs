use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_database_url")]
    pub database_url: String,

    pub spotify_client_id: String,
    pub spotify_client_secret: String,

    #[serde(default = "default_spotify_redirect_uri")]
    pub spotify_redirect_uri: String,

    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    #[serde(default = "default_spotify_api_base")]
    pub spotify_api_base: String,

    #[serde(default = "default_spotify_auth_url")]
    pub spotify_auth_url: String,

    #[serde(default = "default_spotify_token_url")]
    pub spotify_token_url: String,

    #[serde(default = "default_spotify_market")]
    pub spotify_market: String,

    #[serde(default = "default_deezer_api_base")]
    pub deezer_api_base: String,

    /// Liked-song target used when a session is created without one
    #[serde(default = "default_target_length")]
    pub default_target_length: i64,

    #[serde(default = "default_rust_log")]
    pub rust_log: String,

    /// `pretty` or `json`
    #[serde(default = "default_rust_log_format")]
    pub rust_log_format: String,
}

fn default_port() -> u16 {
    5000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_database_url() -> String {
    "sqlite://tuneswipe.db".to_string()
}

fn default_spotify_redirect_uri() -> String {
    "http://127.0.0.1:5000/callback".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_spotify_api_base() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_spotify_auth_url() -> String {
    "https://accounts.spotify.com/authorize".to_string()
}

fn default_spotify_token_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

fn default_spotify_market() -> String {
    "US".to_string()
}

fn default_deezer_api_base() -> String {
    "https://api.deezer.com".to_string()
}

fn default_target_length() -> i64 {
    20
}

fn default_rust_log() -> String {
    "info,tuneswipe=debug".to_string()
}

fn default_rust_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Build a config from explicit `(KEY, value)` pairs instead of the process environment.
    pub fn from_iter<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
