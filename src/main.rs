//! open2do - HTTP Server Entry Point
//!
//! Starts the HTTP server that exposes the task manager API.

use open2do::{api, config::Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "open2do=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: data_dir={}, assistant={}, timeout={:?}",
        config.data_dir.display(),
        config.assistant_command,
        config.assistant_timeout
    );

    api::serve(config).await?;

    Ok(())
}
