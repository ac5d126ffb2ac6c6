//! Reconnect scheduling.

use std::time::Duration;

use crate::constants::RECONNECT_DELAYS_MS;

/// Fixed reconnect schedule.
///
/// One entry per attempt; the schedule length is the attempt budget. Asking
/// for a delay past the end returns the last entry, which keeps the final
/// retries evenly spaced instead of exploding exponentially.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    delays_ms: Vec<u64>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delays_ms: RECONNECT_DELAYS_MS.to_vec(),
        }
    }
}

impl ReconnectPolicy {
    /// Creates a policy with a custom schedule. An empty schedule disables
    /// automatic reconnection entirely.
    #[must_use]
    pub fn new(delays_ms: Vec<u64>) -> Self {
        Self { delays_ms }
    }

    /// Number of reconnect attempts before giving up.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.delays_ms.len()
    }

    /// Delay before the given zero-based attempt.
    #[must_use]
    pub fn delay(&self, attempt: usize) -> Duration {
        let ms = self
            .delays_ms
            .get(attempt)
            .or_else(|| self.delays_ms.last())
            .copied()
            .unwrap_or(0);
        Duration::from_millis(ms)
    }
}
