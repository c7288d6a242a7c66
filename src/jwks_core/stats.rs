//! Counters describing what the refresh loop has done so far.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::time::Instant;

/// Live refresh counters shared between a rotator and its loop.
#[derive(Debug, Default)]
pub struct RotationStats {
    ticks: AtomicU64,
    refreshes: AtomicU64,
    failures: AtomicU64,
    last_refresh: Mutex<Option<Instant>>,
    last_error: Mutex<Option<String>>,
}

impl RotationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one wake-up of the refresh loop.
    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_success(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        *self.last_refresh.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    pub fn record_failure(&self, error: &str) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(error.to_string());
    }

    pub fn snapshot(&self) -> RotationStatsSnapshot {
        RotationStatsSnapshot {
            ticks: self.ticks.load(Ordering::SeqCst),
            refreshes: self.refreshes.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            last_refresh: *self.last_refresh.lock().unwrap_or_else(PoisonError::into_inner),
            last_error: self.last_error.lock().unwrap_or_else(PoisonError::into_inner).clone(),
        }
    }
}

/// Point-in-time copy of `RotationStats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationStatsSnapshot {
    /// Loop wake-ups that attempted a fetch.
    pub ticks: u64,
    /// Successful swaps, including manual refreshes.
    pub refreshes: u64,
    /// Failed refresh attempts, including manual refreshes.
    pub failures: u64,
    pub last_refresh: Option<Instant>,
    pub last_error: Option<String>,
}
