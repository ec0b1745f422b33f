//! RAX Storage Server - Entry Point
//!
//! Serves a virtual hierarchical storage over a line-oriented command
//! protocol, backed by a directory on local disk.

use log::{error, info};
use std::sync::Arc;

use rax_storage::config::ServerConfig;
use rax_storage::server::Server;
use rax_storage::storage::Storage;
use rax_storage::transfer::LocalGateway;

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let (startup, runtime) = config.split();

    for dir in [&startup.storage_root, &startup.download_dir, &startup.upload_dir] {
        if let Err(e) = std::fs::create_dir_all(dir) {
            error!("Failed to create directory {}: {}", dir, e);
            std::process::exit(1);
        }
    }

    let storage = Storage::init(&startup.storage_root, startup.storage_size, &startup.restriction);
    info!("Storage initialized with {} bytes available", storage.available_bytes());
    let storage = storage.into_shared();
    let gateway = LocalGateway::new(
        startup.storage_root_path(),
        startup.download_dir_path(),
        startup.upload_dir_path(),
    )
    .with_buffer_size(startup.buffer_size)
    .with_max_retries(startup.max_retries);

    info!("Backend root: {}", gateway.backend_root().display());
    info!("Launching storage server...");

    match Server::new(&startup, runtime, storage, Arc::new(gateway)).await {
        Ok(server) => server.start().await,
        Err(e) => {
            error!("Server startup failed: {}", e);
            std::process::exit(1);
        }
    }
}
