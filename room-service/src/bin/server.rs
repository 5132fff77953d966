//! Room server binary
//!
//! Opens the configured ledger store and holds the room registry until
//! shutdown. Transports attach through `RoomService::subscribe`.

use room_service::{RoomService, ServiceConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match std::env::var("ROOM_SERVICE_CONFIG") {
        Ok(path) => ServiceConfig::from_file(&path)?,
        Err(_) => ServiceConfig::from_env()?,
    };

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    info!(
        "Starting {} v{} ({:?} backend at {:?})",
        config.service_name, config.version, config.ledger.backend, config.ledger.data_dir
    );

    let service = RoomService::from_config(&config)?;
    info!("Room service ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down room server");
    service.registry().shutdown();

    Ok(())
}
