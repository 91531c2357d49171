//! Simulated clock for deterministic time management in tests

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Simulated instant, in milliseconds since the clock's origin.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SimulatedTimestamp(u64);

impl SimulatedTimestamp {
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Add duration to timestamp
    pub fn add_duration(&self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration_millis(duration)))
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Simulated clock for controlled time progression.
///
/// Clones share the same underlying time.
#[derive(Debug, Clone, Default)]
pub struct SimulatedClock {
    current_time: Arc<AtomicU64>,
}

impl SimulatedClock {
    /// Create a new simulated clock starting at the given timestamp
    pub fn new(start_time: SimulatedTimestamp) -> Self {
        Self {
            current_time: Arc::new(AtomicU64::new(start_time.as_millis())),
        }
    }

    /// Get the current simulated time
    pub fn now(&self) -> SimulatedTimestamp {
        SimulatedTimestamp(self.current_time.load(Ordering::SeqCst))
    }

    /// Advance the simulated time by the given duration
    pub fn advance(&self, duration: Duration) {
        let millis = duration_millis(duration);
        self.current_time
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(millis))
            })
            .ok();
    }

    /// Move the clock forward to `target`; earlier targets leave it unchanged.
    pub fn advance_to(&self, target: SimulatedTimestamp) {
        self.current_time
            .fetch_max(target.as_millis(), Ordering::SeqCst);
    }
}
