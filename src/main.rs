//! Cluedo Game Server
//!
//! Binds the WebSocket server and runs until Ctrl-C.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cluedo::{
    VERSION, MIN_PLAYERS, MAX_PLAYERS,
    network::{GameServer, ServerConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env().context("reading CLUEDO_* settings")?;

    info!("Cluedo Server v{}", VERSION);
    info!("Players per game: {}-{}", MIN_PLAYERS, MAX_PLAYERS);
    if config.admin_token.is_none() {
        info!("No admin token set; force-end disabled");
    }

    let server = std::sync::Arc::new(GameServer::new(config));

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            signal_server.shutdown();
        }
    });

    server.run().await.context("server stopped with an error")?;
    info!("Server stopped");
    Ok(())
}
