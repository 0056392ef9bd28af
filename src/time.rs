//! Simulation time for the DEVS kernel.
//!
//! Represents a point on the simulated time line with no dependency on
//! `std::time`. Time advances only when the coordinator pops a bag from
//! the event table, never from wall-clock observation.

use std::cmp::Ordering;
use std::ops::{Add, Sub};

/// A point in simulation time.
///
/// Wraps an `f64` and reserves `+∞` as the "never scheduled" sentinel.
/// Ordering is total (`f64::total_cmp`), so `Time` can key heaps and
/// ordered maps directly.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Time(f64);

impl Time {
    /// The zero-point of simulation time.
    pub const ZERO: Time = Time(0.0);

    /// The "not scheduled" sentinel.
    pub const INFINITY: Time = Time(f64::INFINITY);

    /// Create a new `Time` from a raw value. `-0.0` becomes `0.0`.
    ///
    /// # Panics
    /// Panics if `value` is NaN.
    #[inline]
    pub fn new(value: f64) -> Self {
        assert!(!value.is_nan(), "simulation time cannot be NaN");
        Time(if value == 0.0 { 0.0 } else { value })
    }

    /// Return the raw value.
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Returns `true` for the "never scheduled" sentinel.
    #[inline]
    pub fn is_infinity(self) -> bool {
        self.0 == f64::INFINITY
    }

    /// Returns `true` if `self` is strictly before `other`.
    #[inline]
    pub fn is_before(self, other: Time) -> bool {
        self < other
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add for Time {
    type Output = Time;

    /// `t + ∞` is `∞`, which is how a time advance of infinity turns
    /// into "no internal event".
    fn add(self, rhs: Time) -> Time {
        Time(self.0 + rhs.0)
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        debug_assert!(
            !(self.is_infinity() && rhs.is_infinity()),
            "infinity - infinity is undefined"
        );
        Time(self.0 - rhs.0)
    }
}

impl From<f64> for Time {
    fn from(value: f64) -> Self {
        Time::new(value)
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_infinity() {
            write!(f, "T=inf")
        } else {
            write!(f, "T={}", self.0)
        }
    }
}
