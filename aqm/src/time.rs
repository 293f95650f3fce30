//! Wraparound-safe CoDel time.
//!
//! CoDel keeps time in a 32-bit counter of `2^10` nanosecond ticks (roughly microsecond
//! granularity). The counter wraps after about 73 minutes of virtual time, so instants must only
//! ever be compared through the signed difference of two readings (see [Time::after] and
//! friends). [Time] intentionally does not implement [PartialOrd].

use std::{
    fmt,
    ops::{Add, Mul, Sub},
    time::Duration,
};

/// Number of low bits discarded from a nanosecond reading.
pub const SHIFT: u32 = 10;

/// A reading of the CoDel clock (or a span measured with it).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Time(u32);

impl Time {
    /// The zero reading.
    pub const ZERO: Self = Self(0);

    /// Create a [Time] from a raw tick count.
    pub const fn from_raw(ticks: u32) -> Self {
        Self(ticks)
    }

    /// Return the raw tick count.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns true if `self` is strictly later than `other`.
    pub const fn after(self, other: Self) -> bool {
        (self.0.wrapping_sub(other.0) as i32) > 0
    }

    /// Returns true if `self` is later than or equal to `other`.
    pub const fn after_eq(self, other: Self) -> bool {
        (self.0.wrapping_sub(other.0) as i32) >= 0
    }

    /// Returns true if `self` is strictly earlier than `other`.
    pub const fn before(self, other: Self) -> bool {
        (self.0.wrapping_sub(other.0) as i32) < 0
    }

    /// Returns true if `self` is earlier than or equal to `other`.
    pub const fn before_eq(self, other: Self) -> bool {
        (self.0.wrapping_sub(other.0) as i32) <= 0
    }
}

impl From<Duration> for Time {
    /// Truncate a [Duration] (measured from the simulation epoch) to CoDel ticks.
    ///
    /// Readings beyond the 32-bit range wrap, which is harmless as long as compared instants are
    /// less than half the range (about 36 minutes) apart.
    fn from(value: Duration) -> Self {
        Self((value.as_nanos() >> SHIFT) as u32)
    }
}

impl Add for Time {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Time {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl Mul<u32> for Time {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self(self.0.wrapping_mul(rhs))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
