//! Time management for the simulation
//!
//! The engine works in wall-clock seconds (`u64` timestamps) because lock
//! expiries, boost decay and the issuance schedule are all defined in seconds.
//! The clock only moves forward and only when the caller advances it, so a
//! run is fully reproducible.

use serde::{Deserialize, Serialize};

/// Seconds in one (non-leap) year
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// Source of the current timestamp
pub trait Clock {
    /// Current timestamp in seconds
    fn now(&self) -> u64;
}

/// Manually advanced, monotonic simulation clock
///
/// # Example
/// ```
/// use token_lock_sim_core::core::time::{Clock, SimClock};
///
/// let mut clock = SimClock::new(1_700_000_000);
/// assert_eq!(clock.now(), 1_700_000_000);
///
/// clock.advance(60);
/// assert_eq!(clock.now(), 1_700_000_060);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimClock {
    /// Current timestamp (seconds)
    now: u64,
    /// Timestamp the clock was created with
    start: u64,
}

impl SimClock {
    /// Create a clock starting at `start`
    pub fn new(start: u64) -> Self {
        Self { now: start, start }
    }

    /// Advance time by `seconds`
    pub fn advance(&mut self, seconds: u64) {
        self.now = self
            .now
            .checked_add(seconds)
            .expect("clock overflowed u64 seconds");
    }

    /// Jump forward to `timestamp`
    ///
    /// # Panics
    /// Panics if `timestamp` is earlier than the current time; the clock is
    /// monotonic for the duration of a run.
    ///
    /// # Example
    /// ```
    /// use token_lock_sim_core::core::time::{Clock, SimClock};
    ///
    /// let mut clock = SimClock::new(100);
    /// clock.advance_to(250);
    /// assert_eq!(clock.now(), 250);
    /// ```
    pub fn advance_to(&mut self, timestamp: u64) {
        assert!(
            timestamp >= self.now,
            "clock must be monotonic: {} is before {}",
            timestamp,
            self.now
        );
        self.now = timestamp;
    }

    /// Seconds elapsed since the clock was created
    pub fn elapsed(&self) -> u64 {
        self.now - self.start
    }

    /// Timestamp the clock was created with
    pub fn start(&self) -> u64 {
        self.start
    }
}

impl Clock for SimClock {
    fn now(&self) -> u64 {
        self.now
    }
}
