use std::path::PathBuf;

use image_proxy::config::{self, ServiceConfig};
use image_proxy::lifecycle::{signals, startup, Shutdown};
use image_proxy::observability::logging;

/// Config file from the first argument or `IMAGE_PROXY_CONFIG`.
fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("IMAGE_PROXY_CONFIG").map(PathBuf::from))
}

fn load() -> Result<ServiceConfig, config::ConfigError> {
    match config_path() {
        Some(path) => config::load_config(&path),
        None => config::loader::from_env_only(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load()?;

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "image-proxy starting");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    startup::run(config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
