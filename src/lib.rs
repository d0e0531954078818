//! loginwatch -- rolling-window brute-force login detection.
//!
//! This crate provides the failure-window detector, a synthetic login
//! traffic simulator, the dashboard state that consumes detections, and an
//! HTTP API exposing it.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod detect;
pub mod replay;
pub mod simulate;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;

use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::simulate::EventGenerator;

/// Start the loginwatch daemon: simulator and API server.
pub async fn serve(config: Config) -> Result<()> {
    let dashboard = Dashboard::shared(&config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // 1. Start the simulator (background task)
    let simulator = if config.simulator.enabled {
        let generator = EventGenerator::from_config(StdRng::from_entropy(), &config.simulator);
        Some(tokio::spawn(simulate::run_simulator_loop(
            dashboard.clone(),
            generator,
            config.simulator.clone(),
            shutdown_rx,
        )))
    } else {
        tracing::info!("Simulator disabled, serving an empty dashboard");
        None
    };

    // 2. Start API Server
    let addr: std::net::SocketAddr = config
        .api
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.api.bind))?;
    let app = api::router(api::state::AppState::new(dashboard));

    tracing::info!(%addr, "loginwatch listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 3. Stop the simulator once the server has drained
    let _ = shutdown_tx.send(true);
    if let Some(handle) = simulator {
        handle.await.context("simulator task panicked")?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
