//! Offline-mode tracking

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Rate-limited, advisory record of whether the backend answered its last health probe
#[derive(Debug)]
pub struct OfflineMonitor {
    offline: AtomicBool,
    last_probe: Mutex<Option<Instant>>,
    interval: Duration,
}

impl OfflineMonitor {
    /// Start online, with no probe yet run
    pub fn new(interval: Duration) -> Self {
        Self {
            offline: AtomicBool::new(false),
            last_probe: Mutex::new(None),
            interval,
        }
    }

    /// Minimum spacing between probes
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Result of the last probe
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::Relaxed)
    }

    /// Record the outcome of a probe
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Claim the next probe slot; false if a probe ran within the interval
    pub fn try_begin_probe(&self) -> bool {
        let mut last = self.last_probe.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        match *last {
            Some(at) if now.duration_since(at) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}
