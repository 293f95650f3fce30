//! Fixed-point helpers for the CoDel control law.
//!
//! The drop interval shrinks as `interval / sqrt(count)`. Rather than computing a square root
//! and a division on every drop, CoDel keeps a 16-bit fixed-point estimate of `1 / sqrt(count)`
//! (scaled so that `0xFFFF` is just below `1.0`) and refines it with one Newton-Raphson iteration
//! each time `count` changes. Because `count` moves by one at a time, a single iteration per
//! change keeps the estimate close to the true value.
//!
//! All arithmetic matches the Linux integer implementation exactly, including its
//! wrapping behavior for estimates far from convergence.

use crate::time::Time;

/// Number of bits kept in [RecInvSqrt].
pub const BITS: u32 = u16::BITS;

/// Shift from the 16-bit stored value to the 32-bit working value.
pub const SHIFT: u32 = 32 - BITS;

/// Fixed-point estimate of `1 / sqrt(count)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecInvSqrt(u16);

impl RecInvSqrt {
    /// Estimate used when `count` is (re)started at one.
    pub const MAX: Self = Self((!0u32 >> SHIFT) as u16);

    /// Wrap a raw 16-bit value.
    pub const fn from_raw(value: u16) -> Self {
        Self(value)
    }

    /// Return the raw 16-bit value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Return the estimate scaled to 32 bits (the working precision of [control_law]).
    pub const fn scaled(self) -> u32 {
        (self.0 as u32) << SHIFT
    }

    /// Perform one Newton-Raphson iteration for the given `count`:
    ///
    /// `new = old * (3 - count * old^2) / 2`
    pub const fn newton_step(self, count: u32) -> Self {
        let invsqrt = self.scaled() as u64;
        let invsqrt2 = (invsqrt * invsqrt) >> 32;
        let mut val = (3u64 << 32).wrapping_sub(count as u64 * invsqrt2);

        // Make room for the following multiply
        val >>= 2;
        val = val.wrapping_mul(invsqrt) >> (32 - 2 + 1);
        Self((val >> SHIFT) as u16)
    }
}

impl Default for RecInvSqrt {
    fn default() -> Self {
        Self::MAX
    }
}

/// Compute `reciprocal * value / 2^32` without a division.
pub const fn reciprocal_scale(value: u32, reciprocal: u32) -> u32 {
    ((value as u64 * reciprocal as u64) >> 32) as u32
}

/// Schedule the next drop: `t + interval / sqrt(count)`.
pub fn control_law(t: Time, interval: Time, rec_inv_sqrt: RecInvSqrt) -> Time {
    t + Time::from_raw(reciprocal_scale(interval.raw(), rec_inv_sqrt.scaled()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_newton_step_from_seed() {
        let seed = RecInvSqrt::MAX;
        assert_eq!(seed.raw(), 0xFFFF);

        let first = seed.newton_step(1);
        assert_eq!(first.raw(), 0xFFFF);

        let second = first.newton_step(2);
        assert_eq!(second.raw(), 0x8001);
    }

    #[test]
    fn test_newton_step_trajectory() {
        let expected = [
            0xFFFF, 0x8001, 0x9000, 0x7CE0, 0x7107, 0x6771, 0x600C, 0x59FD, 0x54F2, 0x50A7,
        ];
        let mut rec = RecInvSqrt::MAX;
        for (i, want) in expected.iter().enumerate() {
            rec = rec.newton_step(i as u32 + 1);
            assert_eq!(rec.raw(), *want, "count {}", i + 1);
        }
    }

    #[test_case(0xFF, 382; "0xff")]
    #[test_case(0x7F, 190; "0x7f")]
    #[test_case(0x3F, 94; "0x3f")]
    #[test_case(0x1F, 46; "0x1f")]
    #[test_case(0x0F, 22; "0x0f")]
    #[test_case(0x07, 10; "0x07")]
    #[test_case(0x03, 4; "0x03")]
    #[test_case(0x01, 1; "0x01")]
    fn test_newton_step_small_estimates(rec: u16, expected: u16) {
        // Far below convergence `count * old^2` vanishes and the step is ~1.5x
        let mut count = 1;
        while count < 0xFF {
            assert_eq!(RecInvSqrt::from_raw(rec).newton_step(count).raw(), expected);
            count *= 2;
        }
    }

    #[test_case(4, 32772; "four")]
    #[test_case(8, 32778; "eight")]
    #[test_case(255, 380; "large")]
    fn test_newton_step_wrapping(count: u32, expected: u16) {
        // `count * old^2` exceeds `3 << 32`, so the subtraction wraps as it does in Linux
        assert_eq!(RecInvSqrt::MAX.newton_step(count).raw(), expected);
    }

    #[test_case(1, 65535; "one")]
    #[test_case(2, 46340; "two")]
    #[test_case(4, 32767; "four")]
    #[test_case(9, 21845; "nine")]
    #[test_case(16, 16383; "sixteen")]
    #[test_case(100, 6553; "hundred")]
    fn test_newton_step_converges(count: u32, expected: u16) {
        let mut rec = RecInvSqrt::MAX;
        for _ in 0..40 {
            rec = rec.newton_step(count);
        }
        assert_eq!(rec.raw(), expected);

        // Within one unit of 65536 / sqrt(count)
        let exact = 65536.0 / (count as f64).sqrt();
        assert!((rec.raw() as f64 - exact).abs() <= 1.0);
    }

    #[test_case(0, 97656, 0xFFFF, 97654; "seed from zero")]
    #[test_case(1000, 97656, 0x8001, 49829; "count two")]
    #[test_case(0xFFFF_FFF0, 97656, 0xFFFF, 97638; "wraps")]
    #[test_case(42, 97656, 0, 42; "zero estimate")]
    fn test_control_law(t: u32, interval: u32, rec: u16, expected: u32) {
        let next = control_law(
            Time::from_raw(t),
            Time::from_raw(interval),
            RecInvSqrt::from_raw(rec),
        );
        assert_eq!(next.raw(), expected);
    }

    #[test]
    fn test_reciprocal_scale() {
        assert_eq!(reciprocal_scale(1000, u32::MAX), 999);
        assert_eq!(reciprocal_scale(1000, 1 << 31), 500);
        assert_eq!(reciprocal_scale(u32::MAX, u32::MAX), u32::MAX - 1);
    }
}
