//! ==============================================================================
//! domain.rs - telemetry payload and sample types
//! ==============================================================================
//!
//! purpose:
//!     the device pushes a loosely-typed json object. we keep it verbatim for
//!     the "latest" slot and project five normalized fields out of it for the
//!     history window.
//!
//! coercion:
//!     a field that is missing or can't be coerced falls back to its default
//!     (numbers -> 0, isSeated -> 0, state -> "UNKNOWN"). only a body that
//!     isn't a json object at all is rejected (see error.rs).
//!
//! ==============================================================================

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::IngestError;

/// label used when the producer sends no `state`
pub const UNKNOWN_STATE: &str = "UNKNOWN";

/// the producer's submission, kept exactly as received
///
/// examples:
/// - {"pitch": 12.5, "seatedTime": 30, "isSeated": 1, "state": "SEATED OK"}
/// - {"pitch": 3.1, "fsr": 2410, "ldr": 1830, "isSeated": 1, "seatedTime": 4, "state": "SEATED OK"}
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RawPayload(Map<String, Value>);

impl RawPayload {
    /// parse a request body; anything but a json object is an InvalidPayload
    pub fn from_slice(body: &[u8]) -> Result<Self, IngestError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| IngestError::InvalidPayload(format!("malformed json: {}", e)))?;
        Self::try_from(value)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// float view of `pitch`
    pub fn pitch(&self) -> f64 {
        self.get("pitch").and_then(coerce_f64).unwrap_or(0.0)
    }

    /// integer view of `seatedTime`
    pub fn seated_time(&self) -> u64 {
        self.get("seatedTime").and_then(coerce_u64).unwrap_or(0)
    }

    /// boolean view of `isSeated` (any non-zero integer counts as seated)
    pub fn is_seated(&self) -> bool {
        self.get("isSeated").and_then(coerce_i64).unwrap_or(0) != 0
    }

    /// the state label, passed through verbatim
    pub fn state(&self) -> String {
        match self.get("state") {
            None | Some(Value::Null) => UNKNOWN_STATE.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

impl fmt::Display for RawPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl TryFrom<Value> for RawPayload {
    type Error = IngestError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(IngestError::InvalidPayload(format!(
                "expected a json object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// one normalized history entry
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Sample {
    /// seconds since the unix epoch, assigned by the server at receipt
    #[serde(rename = "ts")]
    pub timestamp: f64,
    pub pitch: f64,
    #[serde(rename = "seatedTime")]
    pub seated_time: u64,
    #[serde(rename = "isSeated", serialize_with = "bool_as_int")]
    pub is_seated: bool,
    pub state: String,
}

impl Sample {
    pub fn project(payload: &RawPayload, timestamp: f64) -> Self {
        Self {
            timestamp,
            pitch: payload.pitch(),
            seated_time: payload.seated_time(),
            is_seated: payload.is_seated(),
            state: payload.state(),
        }
    }
}

// the dashboard expects 0/1 rather than true/false
fn bool_as_int<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

fn coerce_f64(value: &Value) -> Option<f64> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

fn coerce_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(u)
            } else if n.is_i64() {
                // negative
                None
            } else {
                let f = n.as_f64()?.trunc();
                (f.is_finite() && f >= 0.0 && f <= u64::MAX as f64).then(|| f as u64)
            }
        }
        Value::Bool(b) => Some(u64::from(*b)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else if n.is_u64() {
                Some(i64::MAX)
            } else {
                let f = n.as_f64()?.trunc();
                f.is_finite().then(|| f.clamp(i64::MIN as f64, i64::MAX as f64) as i64)
            }
        }
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
