//! Piecewise-linear issuance schedule
//!
//! Each segment covers the window `[previous.max_time, max_time)` of elapsed
//! seconds since the schedule epoch and evaluates
//!
//! ```text
//! offset_y ± rate * (elapsed_within_window - offset_x)
//! ```
//!
//! Only the segment containing the elapsed time is used; there is no
//! interpolation across segment boundaries. Negative evaluations clamp to
//! zero, and time past the last segment issues nothing.

use crate::core::fixed::SignedValue;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed issuance schedule
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("issuance segments must have increasing max_time ({previous} then {next})")]
    NonIncreasingMaxTime { previous: u64, next: u64 },
}

/// One segment of the issuance curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceSegment {
    /// Exclusive upper bound of the window, in seconds since the epoch
    pub max_time: u64,
    /// Horizontal offset within the window (seconds)
    pub offset_x: u64,
    /// Curve value at `offset_x` (18-decimal rate)
    pub offset_y: U256,
    /// Slope per second (18-decimal rate)
    pub rate: U256,
    /// Slope points down instead of up
    #[serde(default)]
    pub descending: bool,
}

impl IssuanceSegment {
    /// Evaluate at `elapsed` seconds into this segment's window
    pub fn evaluate(&self, elapsed_within_window: u64) -> U256 {
        let dx = SignedValue::difference(
            U256::from(elapsed_within_window),
            U256::from(self.offset_x),
        );
        let slope = SignedValue::new(
            dx.magnitude * self.rate,
            dx.is_positive != self.descending,
        );
        SignedValue::positive(self.offset_y)
            .add(slope)
            .clamp_to_unsigned()
    }
}

/// Ordered issuance curve
///
/// # Example
/// ```
/// use token_lock_sim_core::rewards::{IssuanceSchedule, IssuanceSegment};
/// use primitive_types::U256;
///
/// let schedule = IssuanceSchedule::new(vec![
///     IssuanceSegment { max_time: 100, offset_x: 0, offset_y: U256::from(1_000u64), rate: U256::from(2u64), descending: false },
///     IssuanceSegment { max_time: 200, offset_x: 0, offset_y: U256::from(50u64), rate: U256::zero(), descending: false },
/// ])
/// .unwrap();
///
/// assert_eq!(schedule.rate_at(10), U256::from(1_020u64));
/// assert_eq!(schedule.rate_at(150), U256::from(50u64));
/// assert_eq!(schedule.rate_at(500), U256::zero());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuanceSchedule {
    segments: Vec<IssuanceSegment>,
}

impl IssuanceSchedule {
    /// Build a schedule; `max_time` must be strictly increasing
    pub fn new(segments: Vec<IssuanceSegment>) -> Result<Self, ScheduleError> {
        for pair in segments.windows(2) {
            if pair[1].max_time <= pair[0].max_time {
                return Err(ScheduleError::NonIncreasingMaxTime {
                    previous: pair[0].max_time,
                    next: pair[1].max_time,
                });
            }
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[IssuanceSegment] {
        &self.segments
    }

    /// Segment index whose window contains `elapsed`
    pub fn segment_index(&self, elapsed: u64) -> Option<usize> {
        self.segments.iter().position(|s| elapsed < s.max_time)
    }

    /// Curve value at `elapsed` seconds since the epoch
    pub fn rate_at(&self, elapsed: u64) -> U256 {
        match self.segment_index(elapsed) {
            Some(i) => {
                let window_start = if i == 0 { 0 } else { self.segments[i - 1].max_time };
                self.segments[i].evaluate(elapsed - window_start)
            }
            None => U256::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(max_time: u64, offset_x: u64, offset_y: u64, rate: u64, descending: bool) -> IssuanceSegment {
        IssuanceSegment {
            max_time,
            offset_x,
            offset_y: U256::from(offset_y),
            rate: U256::from(rate),
            descending,
        }
    }

    #[test]
    fn test_window_relative_time() {
        let schedule = IssuanceSchedule::new(vec![seg(10, 0, 0, 1, false), seg(20, 0, 100, 3, false)]).unwrap();
        // 15 is 5 seconds into the second window
        assert_eq!(schedule.rate_at(15), U256::from(115u64));
        // boundary belongs to the next window
        assert_eq!(schedule.rate_at(10), U256::from(100u64));
    }

    #[test]
    fn test_descending_clamps_at_zero() {
        let schedule = IssuanceSchedule::new(vec![seg(100, 0, 50, 1, true)]).unwrap();
        assert_eq!(schedule.rate_at(20), U256::from(30u64));
        assert_eq!(schedule.rate_at(80), U256::zero());
    }

    #[test]
    fn test_before_offset_x() {
        let schedule = IssuanceSchedule::new(vec![seg(100, 10, 50, 2, false)]).unwrap();
        assert_eq!(schedule.rate_at(4), U256::from(38u64));
    }

    #[test]
    fn test_non_increasing_rejected() {
        assert_eq!(
            IssuanceSchedule::new(vec![seg(10, 0, 0, 0, false), seg(10, 0, 0, 0, false)]),
            Err(ScheduleError::NonIncreasingMaxTime { previous: 10, next: 10 })
        );
    }
}
