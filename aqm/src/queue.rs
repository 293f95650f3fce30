//! FIFO packet store with backlog accounting.
//!
//! [Queue] is the storage underneath every discipline: it stamps items on admission, keeps byte
//! and packet counts current on every push and pop, and answers whether an item would exceed the
//! configured [Limit]. It makes no drop decisions of its own.

use crate::ecn::Ecn;
use std::{collections::VecDeque, fmt, time::Duration};

/// Default capacity of a queue, in packets.
pub const DEFAULT_LIMIT: usize = 1000;

/// A packet held by a queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item<P> {
    payload: P,
    size: u32,
    ecn: Ecn,
    timestamp: Duration,
}

impl<P> Item<P> {
    /// Create an item of `size` bytes carrying `payload`.
    pub fn new(payload: P, size: u32, ecn: Ecn) -> Self {
        Self {
            payload,
            size,
            ecn,
            timestamp: Duration::ZERO,
        }
    }

    /// Size of the item in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Current ECN codepoint.
    pub fn ecn(&self) -> Ecn {
        self.ecn
    }

    /// Set CE on the item, returning false if it is not ECN-capable.
    pub fn mark(&mut self) -> bool {
        self.ecn.mark()
    }

    /// Virtual time at which the item was admitted.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Time spent queued as of `now`.
    pub fn sojourn(&self, now: Duration) -> Duration {
        now.saturating_sub(self.timestamp)
    }

    /// Borrow the payload.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Consume the item, returning its payload.
    pub fn into_payload(self) -> P {
        self.payload
    }
}

/// Capacity of a queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Limit {
    /// At most this many packets.
    Packets(usize),
    /// At most this many bytes.
    Bytes(u64),
}

impl Limit {
    /// Returns true if the limit admits nothing.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Packets(n) => *n == 0,
            Self::Bytes(n) => *n == 0,
        }
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self::Packets(DEFAULT_LIMIT)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Packets(n) => write!(f, "{n} packets"),
            Self::Bytes(n) => write!(f, "{n} bytes"),
        }
    }
}

/// Read-only view of a queue's occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Backlog {
    /// Bytes currently queued.
    pub bytes: u64,
    /// Packets currently queued.
    pub packets: usize,
}

/// A FIFO of [Item]s.
#[derive(Debug)]
pub struct Queue<P> {
    items: VecDeque<Item<P>>,
    bytes: u64,
    limit: Limit,
}

impl<P> Queue<P> {
    /// Create an empty queue bounded by `limit`.
    pub fn new(limit: Limit) -> Self {
        Self {
            items: VecDeque::new(),
            bytes: 0,
            limit,
        }
    }

    /// The configured capacity.
    pub fn limit(&self) -> Limit {
        self.limit
    }

    /// Returns true if admitting an item of `size` bytes would exceed the limit.
    pub fn exceeds(&self, size: u32) -> bool {
        match self.limit {
            Limit::Packets(n) => self.items.len() + 1 > n,
            Limit::Bytes(n) => self.bytes + size as u64 > n,
        }
    }

    /// Stamp `item` with `now` and append it.
    ///
    /// The caller is responsible for checking [Queue::exceeds] first.
    pub fn push(&mut self, now: Duration, mut item: Item<P>) {
        item.timestamp = now;
        self.bytes += item.size as u64;
        self.items.push_back(item);
    }

    /// Remove the head item.
    pub fn pop(&mut self) -> Option<Item<P>> {
        let item = self.items.pop_front()?;
        self.bytes -= item.size as u64;
        Some(item)
    }

    /// Borrow the head item.
    pub fn peek(&self) -> Option<&Item<P>> {
        self.items.front()
    }

    /// Bytes currently queued.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Packets currently queued.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current occupancy.
    pub fn backlog(&self) -> Backlog {
        Backlog {
            bytes: self.bytes,
            packets: self.items.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_accounting() {
        let mut queue = Queue::new(Limit::default());
        queue.push(Duration::from_millis(1), Item::new(1u8, 100, Ecn::NotEct));
        queue.push(Duration::from_millis(2), Item::new(2u8, 250, Ecn::Ect0));
        assert_eq!(
            queue.backlog(),
            Backlog {
                bytes: 350,
                packets: 2
            }
        );
        assert_eq!(queue.peek().map(|i| *i.payload()), Some(1));

        let head = queue.pop().unwrap();
        assert_eq!(head.timestamp(), Duration::from_millis(1));
        assert_eq!(head.sojourn(Duration::from_millis(11)), Duration::from_millis(10));
        assert_eq!(queue.bytes(), 250);
        assert_eq!(queue.len(), 1);

        let tail = queue.pop().unwrap();
        assert_eq!(tail.into_payload(), 2);
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
        assert_eq!(queue.backlog(), Backlog::default());
    }

    #[test]
    fn test_packet_limit() {
        let mut queue = Queue::new(Limit::Packets(2));
        assert!(!queue.exceeds(1500));
        queue.push(Duration::ZERO, Item::new((), 1500, Ecn::NotEct));
        assert!(!queue.exceeds(1500));
        queue.push(Duration::ZERO, Item::new((), 1500, Ecn::NotEct));
        assert!(queue.exceeds(1));
    }

    #[test]
    fn test_byte_limit() {
        let mut queue = Queue::new(Limit::Bytes(3000));
        queue.push(Duration::ZERO, Item::new((), 1500, Ecn::NotEct));
        assert!(!queue.exceeds(1500));
        assert!(queue.exceeds(1501));
        queue.push(Duration::ZERO, Item::new((), 1500, Ecn::NotEct));
        assert!(queue.exceeds(1));
        assert!(!queue.exceeds(0));
    }

    #[test]
    fn test_sojourn_saturates() {
        let mut queue = Queue::new(Limit::default());
        queue.push(Duration::from_secs(2), Item::new((), 10, Ecn::NotEct));
        let item = queue.pop().unwrap();
        assert_eq!(item.sojourn(Duration::from_secs(1)), Duration::ZERO);
    }

    #[test]
    fn test_limit_is_zero() {
        assert!(Limit::Packets(0).is_zero());
        assert!(Limit::Bytes(0).is_zero());
        assert!(!Limit::default().is_zero());
        assert_eq!(Limit::default().to_string(), "1000 packets");
    }
}
