//! ==============================================================================
//! posture-sim - simulated posture device
//! ==============================================================================
//!
//! purpose:
//!     pushes the same json the firmware sends, once per interval, so the sink
//!     and dashboard can be exercised without hardware.
//!
//! usage:
//!     posture-sim [URL] [INTERVAL_MS] [COUNT]
//!     posture-sim http://127.0.0.1:5000/api/data 1000 60
//!
//! device logic (same thresholds as the firmware):
//!     - seated when fsr > 2000; the seated timer resets when the seat is empty
//!     - bad posture when pitch > 5.0 degrees
//!     - long sitting after 30 s seated
//!     - label precedence: NOT SEATED, BAD POSTURE, LONG SITTING, SEATED OK
//!
//! ==============================================================================

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://127.0.0.1:5000/api/data";
const DEFAULT_INTERVAL_MS: u64 = 1000;

const FSR_SEATED_THRESH: u32 = 2000;
const PITCH_THRESH: f64 = 5.0;
const BREAK_MS: u64 = 30_000;

/// length of the scripted motion cycle, seconds
const CYCLE_SECS: f64 = 120.0;

/// raw sensor values for one tick
#[derive(Debug, Clone, Copy)]
struct Reading {
    pitch: f64,
    fsr: u32,
    ldr: u32,
}

/// wire format pushed to /api/data
#[derive(Debug, Serialize, PartialEq)]
struct Telemetry {
    pitch: f64,
    fsr: u32,
    ldr: u32,
    #[serde(rename = "isSeated")]
    is_seated: u8,
    #[serde(rename = "seatedTime")]
    seated_time: u64,
    state: &'static str,
}

#[derive(Default)]
struct Device {
    seated_since_ms: Option<u64>,
}

impl Device {
    fn step(&mut self, now_ms: u64, reading: Reading) -> Telemetry {
        let is_seated = reading.fsr > FSR_SEATED_THRESH;

        if !is_seated {
            self.seated_since_ms = None;
        } else if self.seated_since_ms.is_none() {
            self.seated_since_ms = Some(now_ms);
        }

        let seated_ms = self
            .seated_since_ms
            .map(|start| now_ms.saturating_sub(start))
            .unwrap_or(0);

        let bad_posture = reading.pitch > PITCH_THRESH;
        let long_sitting = seated_ms >= BREAK_MS;

        let state = if !is_seated {
            "NOT SEATED"
        } else if bad_posture {
            "BAD POSTURE"
        } else if long_sitting {
            "LONG SITTING"
        } else {
            "SEATED OK"
        };

        Telemetry {
            pitch: (reading.pitch * 100.0).round() / 100.0,
            fsr: reading.fsr,
            ldr: reading.ldr,
            is_seated: u8::from(is_seated),
            seated_time: seated_ms / 1000,
            state,
        }
    }
}

/// scripted cycle: stand, sit upright, slouch, sit upright (long), stand
fn scripted_reading(now_ms: u64) -> Reading {
    let t = (now_ms as f64 / 1000.0) % CYCLE_SECS;
    let wobble = (t * 0.9).sin() * 0.8;

    let (pitch, fsr) = match t {
        t if t < 10.0 => (-2.0 + wobble, 300),
        t if t < 45.0 => (1.5 + wobble, 2600),
        t if t < 60.0 => (11.0 + wobble * 2.0, 2700),
        t if t < 110.0 => (2.0 + wobble, 2550),
        _ => (-1.0 + wobble, 250),
    };

    // slow day/night drift around the dashboard's threshold
    let ldr = 2000.0 + (now_ms as f64 / 60_000.0).sin() * 900.0;

    Reading { pitch, fsr, ldr: ldr.max(0.0) as u32 }
}

struct Args {
    url: String,
    interval: Duration,
    count: Option<u64>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut it = args.into_iter();
    let url = it.next().unwrap_or_else(|| DEFAULT_URL.to_string());
    let interval_ms = match it.next() {
        Some(s) => s.parse::<u64>().with_context(|| format!("invalid interval {:?}", s))?,
        None => DEFAULT_INTERVAL_MS,
    };
    let count = match it.next() {
        Some(s) => Some(s.parse::<u64>().with_context(|| format!("invalid count {:?}", s))?),
        None => None,
    };
    Ok(Args {
        url,
        interval: Duration::from_millis(interval_ms.max(1)),
        count,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    info!("[SIM] pushing to {} every {:?}", args.url, args.interval);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .context("failed to build http client")?;

    let mut device = Device::default();
    let mut ticker = tokio::time::interval(args.interval);
    let start = tokio::time::Instant::now();
    let mut sent = 0u64;

    loop {
        if args.count.is_some_and(|c| sent >= c) {
            break;
        }
        ticker.tick().await;

        let now_ms = start.elapsed().as_millis() as u64;
        let telemetry = device.step(now_ms, scripted_reading(now_ms));
        debug!(?telemetry, "[SIM] tick");

        // fire-and-forget: a failed push is logged and the next tick carries on
        match client.post(&args.url).json(&telemetry).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(
                    "[SIM] pitch={:.2} seated={} seatedTime={}s state={}",
                    telemetry.pitch, telemetry.is_seated, telemetry.seated_time, telemetry.state
                );
            }
            Ok(resp) => warn!("[SIM] sink answered {}", resp.status()),
            Err(e) => warn!("[SIM] push failed: {}", e),
        }
        sent += 1;
    }

    info!("[SIM] sent {} samples", sent);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(pitch: f64, fsr: u32) -> Reading {
        Reading { pitch, fsr, ldr: 1500 }
    }

    #[test]
    fn empty_seat() {
        let mut d = Device::default();
        let t = d.step(1_000, reading(20.0, 100));
        assert_eq!(t.state, "NOT SEATED");
        assert_eq!(t.is_seated, 0);
        assert_eq!(t.seated_time, 0);
    }

    #[test]
    fn timer_counts_then_resets() {
        let mut d = Device::default();
        assert_eq!(d.step(0, reading(1.0, 2500)).state, "SEATED OK");
        let t = d.step(29_999, reading(1.0, 2500));
        assert_eq!((t.seated_time, t.state), (29, "SEATED OK"));
        let t = d.step(30_000, reading(1.0, 2500));
        assert_eq!((t.seated_time, t.state), (30, "LONG SITTING"));

        d.step(31_000, reading(1.0, 2000));
        let t = d.step(32_000, reading(1.0, 2500));
        assert_eq!((t.seated_time, t.state), (0, "SEATED OK"));
    }

    #[test]
    fn bad_posture_beats_long_sitting() {
        let mut d = Device::default();
        d.step(0, reading(1.0, 2500));
        assert_eq!(d.step(40_000, reading(5.01, 2500)).state, "BAD POSTURE");
        assert_eq!(d.step(41_000, reading(5.0, 2500)).state, "LONG SITTING");
    }

    #[test]
    fn wire_shape() {
        let mut d = Device::default();
        let t = d.step(0, Reading { pitch: 3.3333, fsr: 2400, ldr: 1830 });
        assert_eq!(
            serde_json::to_value(&t).unwrap(),
            serde_json::json!({
                "pitch": 3.33, "fsr": 2400, "ldr": 1830,
                "isSeated": 1, "seatedTime": 0, "state": "SEATED OK"
            })
        );
    }

    #[test]
    fn script_covers_every_state() {
        let mut d = Device::default();
        let states: std::collections::HashSet<&str> = (0..120)
            .map(|s| d.step(s * 1000, scripted_reading(s * 1000)).state)
            .collect();
        for s in ["NOT SEATED", "SEATED OK", "BAD POSTURE", "LONG SITTING"] {
            assert!(states.contains(s), "missing {}", s);
        }
    }

    #[test]
    fn args() {
        let a = parse_args(Vec::<String>::new()).unwrap();
        assert_eq!(a.url, DEFAULT_URL);
        assert_eq!(a.interval, Duration::from_millis(1000));
        assert!(a.count.is_none());

        let a = parse_args(["http://x/api/data".into(), "250".into(), "3".into()]).unwrap();
        assert_eq!(a.interval, Duration::from_millis(250));
        assert_eq!(a.count, Some(3));

        assert!(parse_args(["u".into(), "fast".into()]).is_err());
    }
}
