mod api;
mod config;
mod constants;
mod error;
mod fetch;
mod http_client;
mod render;
mod run;
mod summary;
mod table;
mod types;
mod utils;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use reqwest::Client;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::{healthz, plot};
use crate::config::Config;
use crate::types::AppState;
use crate::utils::{init_tracing, register_plot_font};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Arc::new(Config::from_env()?);
    if let Err(error) = register_plot_font(&cfg.font_path) {
        warn!("Charts will render without text: {error:#}");
    }

    let http = Client::builder()
        .timeout(cfg.request_timeout)
        .user_agent("gefs-plume-rs/1.0")
        .build()
        .context("Failed to build reqwest client")?;

    let state = AppState {
        cfg: cfg.clone(),
        http,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/plot/{airport_code}", get(plot))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.listen_addr))?;

    info!(
        "GEFS plume service listening on {} (source {})",
        cfg.listen_addr, cfg.base_url
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
