//! Progress values, throughput measurement and cancellation
//!
//! Everything the worker reports to the controller travels as a
//! [`DownloadEvent`] over a channel; the controller drains it on its own
//! schedule.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::queue::QueueEntry;

/// Snapshot of the item currently being transferred
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    /// 1-based position of the item in the playlist
    pub item_index: usize,
    pub item_count: usize,
    pub file_name: String,
    /// 0..=100
    pub percent_complete: u8,
    /// Bytes per second since the previous update
    pub instantaneous_bps: f64,
    /// Bytes per second over the whole playlist run
    pub cumulative_bps: f64,
}

/// Messages posted by the download worker
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// Phase change (connecting, fetching, downloading X, completed, stopped)
    Status(String),
    /// Item progress, rate-limited by the transfer engine
    Progress(TransferProgress),
    /// An item is on disk, either transferred now or already present
    ItemFinished {
        item_index: usize,
        item_count: usize,
    },
    /// An item failed; the playlist continues
    ItemFailed { file_name: String, error: String },
    /// A queue entry changed status or counters
    EntryChanged { index: usize, entry: QueueEntry },
}

/// Sink the worker reports through
pub type EventSink<'a> = dyn FnMut(DownloadEvent) + Send + 'a;

/// Cooperative cancellation flag shared between controller and worker
///
/// Reads and writes are atomic (`SeqCst`); the controller only ever sets it,
/// the worker only ever reads it. A new download session gets a new flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bytes per second, 0.0 when no time has elapsed
pub fn rate(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { bytes as f64 / secs } else { 0.0 }
}

/// Percentage of `copied` over `expected`, floored and capped at 100
///
/// Returns `None` when the expected size is unknown.
pub fn percent(copied: u64, expected: Option<u64>) -> Option<u8> {
    match expected {
        Some(total) if total > 0 => {
            let pct = (copied as u128 * 100) / total as u128;
            Some(pct.min(100) as u8)
        }
        _ => None,
    }
}

/// Cumulative throughput for one playlist run
#[derive(Debug, Clone)]
pub struct ThroughputMeter {
    started: Instant,
    total_bytes: u64,
}

impl ThroughputMeter {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            total_bytes: 0,
        }
    }

    pub fn record(&mut self, bytes: u64) {
        self.total_bytes += bytes;
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Average bytes per second since the run started
    pub fn cumulative_bps(&self) -> f64 {
        rate(self.total_bytes, self.elapsed())
    }
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::start()
    }
}

/// Rate limiter for progress ticks that also measures instantaneous throughput
#[derive(Debug)]
pub struct ProgressGate {
    interval: Duration,
    last_emit: Instant,
    bytes_since_emit: u64,
}

impl ProgressGate {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_emit: now,
            bytes_since_emit: 0,
        }
    }

    /// Account for `bytes`; returns the instantaneous rate when a tick is due
    pub fn observe(&mut self, bytes: u64, now: Instant) -> Option<f64> {
        self.bytes_since_emit += bytes;
        let since = now.saturating_duration_since(self.last_emit);
        if since < self.interval {
            return None;
        }
        let instantaneous = rate(self.bytes_since_emit, since);
        self.last_emit = now;
        self.bytes_since_emit = 0;
        Some(instantaneous)
    }
}
