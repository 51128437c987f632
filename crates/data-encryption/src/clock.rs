//! Monotonic time source used for cache expiry
//!
//! The caching key provider never reads the system clock directly; it asks a
//! [`Clock`]. Production code uses [`SystemClock`], tests drive a
//! [`MockClock`] forward without sleeping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Abstraction over "now" for TTL bookkeeping
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same elapsed counter, so a test can keep one handle and
/// give another to the component under test.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self { start: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Advance the mock clock by whole seconds
    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for clock.
    use super::*;

    /// Validates `MockClock::advance` moves `now()` by exactly the advanced
    /// amount.
    ///
    /// Assertions:
    /// - Confirms `after - before` equals the advanced duration.
    #[test]
    fn mock_clock_advances_deterministically() {
        let clock = MockClock::new();
        let before = clock.now();
        clock.advance(Duration::from_millis(1500));
        clock.advance_secs(2);

        assert_eq!(clock.now() - before, Duration::from_millis(3500));
        assert_eq!(clock.elapsed(), Duration::from_millis(3500));
    }

    #[test]
    fn clones_share_elapsed_time() {
        let clock = MockClock::new();
        let handle = clock.clone();
        handle.advance_secs(10);

        assert_eq!(clock.elapsed(), Duration::from_secs(10));
        assert_eq!(clock.now(), handle.now());
    }

    #[test]
    fn arc_clock_delegates() {
        let clock = Arc::new(MockClock::new());
        let before = Clock::now(&clock);
        clock.advance_secs(1);
        assert_eq!(Clock::now(&clock) - before, Duration::from_secs(1));
    }
}
