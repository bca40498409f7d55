//! ==============================================================================
//! store.rs - latest sample + sliding history window
//! ==============================================================================
//!
//! purpose:
//!     single source of truth for telemetry state. the ingest handler writes,
//!     the dashboard polls read.
//!
//! concurrency:
//!     the latest slot and the history window live behind ONE rwlock so a
//!     reader always sees both halves of an append or neither.
//!     - append takes the write lock (appends exclude each other and readers)
//!     - latest/snapshot take the read lock just long enough to copy out
//!     readers never block each other.
//!
//! ==============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;

use crate::domain::{RawPayload, Sample};

/// ~3 minutes of history at the device's 1 Hz push rate
pub const HISTORY_CAPACITY: usize = 180;

#[derive(Default)]
struct Inner {
    latest: Option<Arc<RawPayload>>,
    history: VecDeque<Sample>,
}

/// Clone-able handle; every clone points at the same state.
#[derive(Clone)]
pub struct SampleStore {
    inner: Arc<RwLock<Inner>>,
    capacity: usize,
    /// seconds since the unix epoch
    clock: fn() -> f64,
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleStore {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// a store with a custom window size (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(RwLock::new(Inner {
                latest: None,
                history: VecDeque::with_capacity(capacity),
            })),
            capacity,
            clock: unix_now,
        }
    }

    /// replace the wall clock used to stamp samples
    pub fn with_clock(mut self, clock: fn() -> f64) -> Self {
        self.clock = clock;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store `payload` as the latest sample and push its projection onto the
    /// history window, evicting the oldest entry when full.
    ///
    /// Returns the sample that was appended.
    pub async fn append(&self, payload: RawPayload) -> Sample {
        let payload = Arc::new(payload);
        let mut inner = self.inner.write().await;

        // stamped under the lock so history order == timestamp order,
        // even if the wall clock steps backwards
        let now = (self.clock)();
        let timestamp = match inner.history.back() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };
        let sample = Sample::project(&payload, timestamp);

        if inner.history.len() == self.capacity {
            inner.history.pop_front();
        }
        inner.history.push_back(sample.clone());
        inner.latest = Some(payload);

        sample
    }

    /// most recent payload, verbatim; None before the first ingest
    pub async fn latest(&self) -> Option<Arc<RawPayload>> {
        self.inner.read().await.latest.clone()
    }

    /// independent copy of the history window, oldest first
    pub async fn snapshot(&self) -> Vec<Sample> {
        self.inner.read().await.history.iter().cloned().collect()
    }

    /// latest payload and history copied under the same read guard
    pub async fn view(&self) -> (Option<Arc<RawPayload>>, Vec<Sample>) {
        let inner = self.inner.read().await;
        (inner.latest.clone(), inner.history.iter().cloned().collect())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.history.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn unix_now() -> f64 {
    // a clock before 1970 is treated as the epoch itself
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn payload(n: u64) -> RawPayload {
        RawPayload::try_from(json!({
            "pitch": n as f64 / 2.0,
            "seatedTime": n,
            "isSeated": 1,
            "state": "SEATED OK",
            "fsr": 2100 + n,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn starts_empty() {
        let store = SampleStore::new();
        assert!(store.latest().await.is_none());
        assert!(store.snapshot().await.is_empty());
        assert_eq!(store.capacity(), HISTORY_CAPACITY);
    }

    #[tokio::test]
    async fn grows_until_capacity() {
        let store = SampleStore::new();
        for n in 0..HISTORY_CAPACITY as u64 {
            store.append(payload(n)).await;
            assert_eq!(store.len().await, n as usize + 1);
        }
    }

    #[tokio::test]
    async fn evicts_oldest_first() {
        let store = SampleStore::new();
        let total = HISTORY_CAPACITY as u64 + 25;
        for n in 0..total {
            store.append(payload(n)).await;
        }

        let history = store.snapshot().await;
        assert_eq!(history.len(), HISTORY_CAPACITY);
        let kept: Vec<u64> = history.iter().map(|s| s.seated_time).collect();
        let expected: Vec<u64> = (total - HISTORY_CAPACITY as u64..total).collect();
        assert_eq!(kept, expected);
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn latest_is_last_payload_verbatim() {
        let store = SampleStore::new();
        for n in 0..5 {
            store.append(payload(n)).await;
        }
        let latest = store.latest().await.unwrap();
        assert_eq!(*latest, payload(4));
        assert_eq!(latest.get("fsr"), Some(&json!(2104)));
    }

    #[tokio::test]
    async fn snapshot_is_detached_from_live_window() {
        let store = SampleStore::with_capacity(3);
        for n in 0..3 {
            store.append(payload(n)).await;
        }
        let before = store.snapshot().await;
        store.append(payload(99)).await;

        assert_eq!(
            before.iter().map(|s| s.seated_time).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(
            store.snapshot().await.iter().map(|s| s.seated_time).collect::<Vec<_>>(),
            vec![1, 2, 99]
        );
    }

    #[tokio::test]
    async fn append_returns_stamped_sample() {
        let store = SampleStore::new();
        let sample = store.append(payload(7)).await;
        assert!(sample.timestamp > 0.0);
        assert_eq!(store.snapshot().await, vec![sample]);
    }

    #[tokio::test]
    async fn clock_stepping_back_keeps_history_ascending() {
        static TICKS: AtomicUsize = AtomicUsize::new(0);
        fn jumpy_clock() -> f64 {
            [100.0, 200.0, 50.0, 300.0, 10.0][TICKS.fetch_add(1, Ordering::SeqCst) % 5]
        }

        let store = SampleStore::new().with_clock(jumpy_clock);
        for n in 0..5 {
            store.append(payload(n)).await;
        }
        let stamps: Vec<f64> = store.snapshot().await.iter().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![100.0, 200.0, 200.0, 300.0, 300.0]);
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let store = SampleStore::with_capacity(0);
        store.append(payload(1)).await;
        store.append(payload(2)).await;
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.snapshot().await[0].seated_time, 2);
    }
}
