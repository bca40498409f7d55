//! ingest errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// body is malformed json or not a json object; nothing was stored
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        match self {
            // the producer never reads response bodies
            IngestError::InvalidPayload(_) => StatusCode::BAD_REQUEST.into_response(),
        }
    }
}
