//! Active queue management for a discrete-event network simulator.
//!
//! A queue discipline sits between a sender and a link: packets are offered with
//! [QueueDisc::enqueue] and pulled with [QueueDisc::dequeue] whenever the link is ready. The
//! discipline decides which packets to admit, which to discard, and which to mark with ECN
//! congestion experienced (CE).
//!
//! Two disciplines are provided:
//!
//! * [fifo::Fifo]: drop-tail, rejecting packets only when the queue is full.
//! * [codel::CoDel]: Controlled Delay (RFC 8289), dropping or marking packets from the head of
//!   the queue once their sojourn time has stayed above a target for a full interval.
//!
//! [Discipline] selects between them from configuration.
//!
//! # Time
//!
//! Disciplines never read a clock. Every call takes `now`, the virtual time since the
//! simulation epoch, which the caller must supply monotonically.
//!
//! # Example
//!
//! ```rust
//! use netsim_aqm::{codel, Admission, Discipline, Ecn, Item};
//! use prometheus_client::registry::Registry;
//! use std::time::Duration;
//!
//! let mut registry = Registry::default();
//! let mut disc = Discipline::CoDel(codel::Config::default())
//!     .build::<u64>(&mut registry)
//!     .unwrap();
//!
//! let admission = disc.enqueue(Duration::ZERO, Item::new(1, 1500, Ecn::NotEct));
//! assert!(matches!(admission, Admission::Accepted));
//!
//! let dequeued = disc.dequeue(Duration::from_millis(1)).unwrap();
//! assert_eq!(dequeued.item.into_payload(), 1);
//! assert!(dequeued.mark.is_none());
//! ```
//!
//! # Status
//!
//! `netsim-aqm` is **ALPHA** software and is not yet recommended for production use. Developers
//! should expect breaking changes and occasional instability.

use std::time::Duration;
use thiserror::Error;

pub mod audit;
pub mod codel;
mod discipline;
pub mod ecn;
pub mod fifo;
pub mod fixed;
pub mod metrics;
pub mod observer;
pub mod queue;
pub mod stats;
pub mod time;

pub use discipline::Discipline;
pub use ecn::Ecn;
pub use queue::{Backlog, Item, Limit};
pub use stats::{Reason, Stats};

/// Errors that can occur when configuring a discipline.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("L4S mode requires ECN")]
    L4sWithoutEcn,
    #[error("interval ({interval:?}) must exceed target ({target:?})")]
    IntervalNotAboveTarget { interval: Duration, target: Duration },
    #[error("interval too large: {0:?}")]
    IntervalTooLarge(Duration),
    #[error("invalid limit: {0}")]
    InvalidLimit(Limit),
}

/// Outcome of [QueueDisc::enqueue].
#[derive(Debug, PartialEq, Eq)]
pub enum Admission<P> {
    /// The item was queued.
    Accepted,
    /// The item was refused and is handed back to the caller.
    Rejected { reason: Reason, item: Item<P> },
}

impl<P> Admission<P> {
    /// Returns true if the item was queued.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// An item returned by [QueueDisc::dequeue].
#[derive(Debug, PartialEq, Eq)]
pub struct Dequeued<P> {
    /// The delivered item (its ECN codepoint reflects any mark applied).
    pub item: Item<P>,
    /// Set if the discipline marked the item CE on the way out.
    pub mark: Option<Reason>,
}

/// A queue discipline.
pub trait QueueDisc<P>: Send {
    /// Validate the configuration the discipline was built with.
    fn check_config(&self) -> Result<(), Error>;

    /// Reset all algorithm state to its initial values.
    ///
    /// Queued items and statistics are left untouched.
    fn initialize_params(&mut self);

    /// Offer an item at `now`.
    fn enqueue(&mut self, now: Duration, item: Item<P>) -> Admission<P>;

    /// Pull the next item to transmit at `now`, discarding any the discipline drops on the way.
    ///
    /// Returns `None` once the queue is (or becomes) empty.
    fn dequeue(&mut self, now: Duration) -> Option<Dequeued<P>>;

    /// Current occupancy.
    fn backlog(&self) -> Backlog;

    /// Counters accumulated since construction.
    fn stats(&self) -> &Stats;
}
