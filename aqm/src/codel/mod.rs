//! Controlled Delay (CoDel) active queue management.
//!
//! CoDel bounds the standing delay of a queue rather than its length. Every packet is stamped on
//! admission; when it reaches the head of the queue, its sojourn time is compared to a `target`.
//! Short bursts are absorbed: dropping only starts once the sojourn time has stayed at or above
//! target for a full `interval` (and at least `min_bytes` remain queued). From then on packets are
//! dropped (or, if ECN is enabled and the packet is ECN-capable, marked CE) at a rate that grows
//! with the square root of the number of drops so far, until the sojourn time falls below target
//! again.
//!
//! # Time
//!
//! All decisions use a 32-bit clock of 1024 ns ticks (see [crate::time]). The clock wraps after
//! about 73 minutes of virtual time; every comparison is wraparound-safe.
//!
//! # Control Law
//!
//! Inside a dropping episode, the next drop is scheduled `interval / sqrt(count)` after the
//! previous one. `1/sqrt(count)` is tracked incrementally as 16-bit fixed point with one Newton
//! step per drop (see [crate::fixed]), which is bit-for-bit compatible with Linux and RFC 8289.
//!
//! When a new episode starts shortly after the previous one ended (within `16 * interval` of the
//! last scheduled drop), the drop rate resumes from where it left off instead of restarting at
//! `count = 1`.
//!
//! # ECN and L4S
//!
//! With `use_ecn`, ECN-capable packets are marked instead of dropped and, if `ce_threshold` is
//! set, any packet that waited longer than the threshold is marked as well. With `use_l4s`,
//! packets carrying `ECT(1)` or `CE` bypass the drop law entirely and are only marked when they
//! exceed `ce_threshold`.
//!
//! # Example
//!
//! ```rust
//! use netsim_aqm::{codel::{CoDel, Config}, Ecn, Item, QueueDisc};
//! use prometheus_client::registry::Registry;
//! use std::time::Duration;
//!
//! let mut registry = Registry::default();
//! let mut codel = CoDel::new(&mut registry, Config::default()).unwrap();
//!
//! // Keep the standing delay at 50ms, well above the 5ms target
//! for ms in 0..200u64 {
//!     let now = Duration::from_millis(ms);
//!     codel.enqueue(now, Item::new(ms, 1000, Ecn::NotEct));
//!     if ms >= 50 {
//!         codel.dequeue(now);
//!     }
//! }
//!
//! // One interval after the delay was first seen above target, CoDel started dropping
//! assert!(codel.dropping());
//! assert_eq!(codel.count(), 1);
//! ```

use crate::{queue::Limit, Error};
use std::time::Duration;

mod disc;
pub mod law;
pub mod metrics;

pub use disc::CoDel;

/// Default acceptable standing delay.
pub const DEFAULT_TARGET: Duration = Duration::from_millis(5);

/// Default width of the window a standing queue must persist for.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Default minimum backlog (one MTU-sized Ethernet frame) for dropping to occur.
pub const DEFAULT_MIN_BYTES: u32 = 1514;

/// Maximum number of CoDel ticks `16 * interval` may span.
const MAX_REENTRY_TICKS: u128 = 1 << 31;

/// Configuration for [CoDel].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Capacity of the queue.
    pub limit: Limit,

    /// Acceptable standing queue delay.
    pub target: Duration,

    /// Width of the window a standing queue must persist for before dropping starts.
    pub interval: Duration,

    /// Minimum backlog (in bytes, not counting the head packet) for a packet to be dropped.
    pub min_bytes: u32,

    /// Sojourn time above which ECN-capable packets are marked CE, if any.
    pub ce_threshold: Option<Duration>,

    /// Whether to mark ECN-capable packets instead of dropping them.
    pub use_ecn: bool,

    /// Whether `ECT(1)` and `CE` packets bypass the drop law (requires `use_ecn`).
    pub use_l4s: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limit: Limit::default(),
            target: DEFAULT_TARGET,
            interval: DEFAULT_INTERVAL,
            min_bytes: DEFAULT_MIN_BYTES,
            ce_threshold: None,
            use_ecn: false,
            use_l4s: false,
        }
    }
}

impl Config {
    /// Returns an error if the configuration cannot drive a [CoDel] instance.
    pub fn validate(&self) -> Result<(), Error> {
        if self.use_l4s && !self.use_ecn {
            return Err(Error::L4sWithoutEcn);
        }
        if self.limit.is_zero() {
            return Err(Error::InvalidLimit(self.limit));
        }
        if self.interval <= self.target {
            return Err(Error::IntervalNotAboveTarget {
                interval: self.interval,
                target: self.target,
            });
        }
        let ticks = self.interval.as_nanos() >> crate::time::SHIFT;
        if ticks * 16 >= MAX_REENTRY_TICKS {
            return Err(Error::IntervalTooLarge(self.interval));
        }
        Ok(())
    }
}
