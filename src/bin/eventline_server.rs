//! eventline-server: timeline event store over HTTP
//!
//! ## Architecture
//! ```text
//! [HTTP client] -> [REST API :8000] -> [EventStore]
//!                                          |
//!                                          v
//!                                [memory | Redis | MongoDB]
//! ```
//!
//! ## Configuration
//! - EVENTLINE_CONFIG: path to a YAML config file
//! - EVENTLINE__SERVER__PORT, EVENTLINE__STORAGE__TYPE, ...: overrides
//! - EVENTLINE_LOG: tracing filter (default: info)

use tracing::{error, info};

use eventline::api;
use eventline::config::Config;
use eventline::storage::init_storage;
use eventline::utils::bootstrap::{init_tracing, shutdown_signal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;

    info!(
        address = %config.server.bind_address(),
        storage = %config.storage.storage_type,
        "starting eventline-server"
    );

    let store = init_storage(&config.storage).await?;

    api::serve(store, &config.server, shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = %e, "REST server failed");
            e as Box<dyn std::error::Error>
        })?;

    info!("eventline-server stopped");
    Ok(())
}
