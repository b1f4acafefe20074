use tuneswipe::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tuneswipe::run(config).await
}
