//! # Simulated Time
//!
//! The beam management model never reads a global clock. Every operation that
//! depends on time takes a [`SimTime`] supplied by the host scheduler, which
//! keeps the core deterministic and lets tests drive it with synthetic
//! timestamps.
//!
//! ```text
//!  scheduler ──► SimTime ──► BeamSweepEngine::advance_if_due(now)
//!                        └─► BeamMeasurementTable::commit_best(now)
//! ```
//!
//! `SimTime` is a nanosecond counter since the start of the simulation. It is
//! opaque to the model: values are only stored, compared and offset by
//! [`Duration`]s.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

/// Point in simulated time, in nanoseconds since simulation start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime {
    nanos: u64,
}

impl SimTime {
    /// Simulation start.
    pub const ZERO: SimTime = SimTime { nanos: 0 };

    /// Create a time from nanoseconds since start.
    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Create a time from microseconds since start.
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Self {
            nanos: micros.saturating_mul(1_000),
        }
    }

    /// Create a time from milliseconds since start.
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            nanos: millis.saturating_mul(1_000_000),
        }
    }

    /// Create a time from fractional microseconds (rounded to the nearest ns).
    ///
    /// Slot and symbol periods are specified in microseconds with fractional
    /// parts (e.g. 62.5 us), so this is the common constructor for
    /// numerology-derived instants.
    pub fn from_micros_f64(micros: f64) -> Self {
        if !micros.is_finite() || micros <= 0.0 {
            return Self::ZERO;
        }
        Self {
            nanos: (micros * 1_000.0).round() as u64,
        }
    }

    /// Nanoseconds since start.
    #[inline]
    pub const fn as_nanos(&self) -> u64 {
        self.nanos
    }

    /// Microseconds since start (truncated).
    #[inline]
    pub const fn as_micros(&self) -> u64 {
        self.nanos / 1_000
    }

    /// Seconds since start.
    #[inline]
    pub fn as_secs_f64(&self) -> f64 {
        self.nanos as f64 / 1e9
    }

    /// True at the very start of the simulation.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.nanos == 0
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future.
    #[inline]
    pub fn saturating_duration_since(&self, earlier: SimTime) -> Duration {
        Duration::from_nanos(self.nanos.saturating_sub(earlier.nanos))
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> Self::Output {
        let delta = u64::try_from(rhs.as_nanos()).unwrap_or(u64::MAX);
        SimTime {
            nanos: self.nanos.saturating_add(delta),
        }
    }
}

impl Sub for SimTime {
    type Output = Duration;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.saturating_duration_since(rhs)
    }
}

impl From<Duration> for SimTime {
    fn from(d: Duration) -> Self {
        SimTime::ZERO + d
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9}s", self.as_secs_f64())
    }
}

/// Convert fractional microseconds into a [`Duration`].
pub fn micros_f64(micros: f64) -> Duration {
    if !micros.is_finite() || micros <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((micros * 1_000.0).round() as u64)
}
