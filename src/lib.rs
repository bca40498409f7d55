//! posture-sink: telemetry sink for a single posture-sensing device.
//!
//! - `store`: latest payload + fixed-size history window, safe for concurrent use
//! - `service`: the axum router the device and the dashboard talk to
//! - `domain`: payload/sample types and field coercion
//! - `config`: `sink.toml` loader

pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod store;

pub use domain::{RawPayload, Sample};
pub use error::IngestError;
pub use store::{SampleStore, HISTORY_CAPACITY};
