//! ==============================================================================
//! main.rs - posture sink entry point
//! ==============================================================================
//!
//! purpose:
//!     receives telemetry pushed by the posture device and serves it back to
//!     the polling dashboard.
//!
//! responsibilities:
//!     - load configuration (config/sink.toml + env overrides)
//!     - initialize logging
//!     - own the SampleStore for the lifetime of the process
//!     - serve the http api until ctrl-c / sigterm
//!
//! architecture:
//!
//!     ┌────────────┐  POST /api/data   ┌──────────────────────────────┐
//!     │   device   │ ────────────────> │  service.rs (axum router)    │
//!     └────────────┘                   │        │            ▲        │
//!                                      │   append│    latest/snapshot  │
//!     ┌────────────┐  GET /api/latest  │        ▼            │        │
//!     │ dashboard  │ <──────────────── │  store.rs (one RwLock)       │
//!     └────────────┘  GET /api/history └──────────────────────────────┘
//!
//! ==============================================================================

use anyhow::{Context, Result};
use posture_sink::config::SinkConfig;
use posture_sink::service::{self, AppState};
use posture_sink::store::SampleStore;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration
    let (mut config, notes) = SinkConfig::load_or_default();

    // step 2: logging (RUST_LOG beats the config file)
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.logging.level))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    for note in &notes {
        info!("[CONFIG] {}", note);
    }
    config.apply_env_overrides();
    config.log_summary();

    // step 3: the store lives as long as the server
    let store = SampleStore::new();
    let state = AppState::new(store).with_show_payloads(config.logging.show_payloads);

    // step 4: serve
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("[STARTUP] posture sink listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, service::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("[ERROR] server error: {}", e);
        return Err(e.into());
    }

    info!("[SHUTDOWN] bye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {}", e);
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
                warn!("failed to listen for sigterm: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("[SHUTDOWN] signal received, draining connections");
}
