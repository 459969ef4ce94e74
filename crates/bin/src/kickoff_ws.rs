//! Kickoff WS - Pure game server binary

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Kickoff - Pure Game Server v{}", env!("CARGO_PKG_VERSION"));

    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Field: {}x{}", config.field.width, config.field.height);
    info!("  Match length: {}s", config.game.duration_secs);

    // WebSocket only, no HTTP endpoints
    server::run(config).await?;

    Ok(())
}
