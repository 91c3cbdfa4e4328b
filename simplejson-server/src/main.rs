use anyhow::Result;
use simplejson_core::Datasources;
use simplejson_server::{build_router, demo::DemoDatasource, AppState, ServerConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = ServerConfig::load()?;
    config.validate()?;
    info!("Loaded configuration: {:?}", config);

    let sources = Datasources::all(Arc::new(DemoDatasource::new()));
    let bind_address = config.bind_address.clone();
    let app = build_router(AppState::new(sources, config));

    // Start server
    let listener = TcpListener::bind(&bind_address).await?;
    let addr = listener.local_addr()?;
    info!("SimpleJSON adapter listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("SimpleJSON adapter stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
