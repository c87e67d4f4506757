//! # grtk-api — Binary Entry Point
//!
//! Starts the capability server. Configuration comes from the environment;
//! see [`grtk_api::state::AppConfig`].

use grtk_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("invalid configuration: {e}");
        e
    })?;
    let port = config.port;
    tracing::info!(
        compute_timeout_secs = config.compute_timeout.as_secs(),
        max_inflight = config.max_inflight,
        "configuration loaded"
    );

    let state = AppState::new(config)?;
    let app = grtk_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("GRTK API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
