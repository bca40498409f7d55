//! ==============================================================================
//! service.rs - http surface over the sample store
//! ==============================================================================
//!
//! routes:
//!     POST /api/data     producer push, 204 / 400, never a response body
//!     GET  /api/latest   last payload verbatim, or {"message": "no data yet"}
//!     GET  /api/history  up to 180 samples, oldest first
//!     GET  /             static dashboard (polls the two GET endpoints)
//!
//! the service keeps no state of its own; everything goes through SampleStore.
//!
//! ==============================================================================

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::domain::{RawPayload, Sample};
use crate::error::IngestError;
use crate::store::SampleStore;

const DASHBOARD_HTML: &str = include_str!("dashboard.html");

/// shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: SampleStore,
    /// echo every accepted payload at info level
    pub show_payloads: bool,
}

impl AppState {
    pub fn new(store: SampleStore) -> Self {
        Self { store, show_payloads: false }
    }

    pub fn with_show_payloads(mut self, show: bool) -> Self {
        self.show_payloads = show;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api/data", post(ingest_handler))
        .route("/api/latest", get(latest_handler))
        .route("/api/history", get(history_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// producer push
///
/// the body is parsed by hand: the device doesn't reliably send a json
/// content-type, so axum's Json extractor would turn it away.
async fn ingest_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, IngestError> {
    let payload = RawPayload::from_slice(&body).map_err(|e| {
        warn!("[INGEST] rejected: {}", e);
        e
    })?;

    if state.show_payloads {
        info!(%payload, "[INGEST] received");
    }
    let sample = state.store.append(payload).await;
    debug!(ts = sample.timestamp, pitch = sample.pitch, state = %sample.state, "[INGEST] stored");

    Ok(StatusCode::NO_CONTENT)
}

async fn latest_handler(State(state): State<AppState>) -> Response {
    match state.store.latest().await {
        Some(payload) => Json(RawPayload::clone(&payload)).into_response(),
        // the dashboard branches on the presence of "message"
        None => Json(json!({"message": "no data yet"})).into_response(),
    }
}

async fn history_handler(State(state): State<AppState>) -> Json<Vec<Sample>> {
    Json(state.store.snapshot().await)
}

async fn dashboard_handler() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}
