//! Drop-tail FIFO.
//!
//! [Fifo] admits packets until its [Limit] is reached and delivers them in arrival order. It never
//! drops from the head of the queue and never marks.

use crate::{
    metrics::Metrics,
    queue::{Backlog, Item, Limit, Queue},
    stats::{Reason, Stats},
    Admission, Dequeued, Error, QueueDisc,
};
use prometheus_client::registry::Registry;
use std::time::Duration;
use tracing::{debug, trace};

/// Configuration for [Fifo].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// Capacity of the queue.
    pub limit: Limit,
}

impl Config {
    /// Returns an error if the configuration cannot drive a [Fifo].
    pub fn validate(&self) -> Result<(), Error> {
        if self.limit.is_zero() {
            return Err(Error::InvalidLimit(self.limit));
        }
        Ok(())
    }
}

/// A drop-tail queue discipline.
pub struct Fifo<P> {
    config: Config,
    queue: Queue<P>,
    stats: Stats,
    metrics: Metrics,
}

impl<P> Fifo<P> {
    /// Create a new [Fifo], registering its metrics with `registry`.
    pub fn new(registry: &mut Registry, config: Config) -> Result<Self, Error> {
        config.validate()?;
        debug!(?config, "created fifo");
        Ok(Self {
            queue: Queue::new(config.limit),
            stats: Stats::default(),
            metrics: Metrics::init(registry),
            config,
        })
    }
}

impl<P: Send> QueueDisc<P> for Fifo<P> {
    fn check_config(&self) -> Result<(), Error> {
        self.config.validate()
    }

    fn initialize_params(&mut self) {}

    fn enqueue(&mut self, now: Duration, item: Item<P>) -> Admission<P> {
        let size = item.size();
        self.stats.received(size);
        if self.queue.exceeds(size) {
            let reason = Reason::OverlimitDrop;
            trace!(?reason, size, "rejected");
            self.stats.dropped_before_enqueue(reason, size);
            self.metrics.record_drop(reason);
            return Admission::Rejected { reason, item };
        }
        self.queue.push(now, item);
        self.metrics.enqueued.inc();
        self.metrics.backlog(self.queue.backlog());
        Admission::Accepted
    }

    fn dequeue(&mut self, _now: Duration) -> Option<Dequeued<P>> {
        let item = self.queue.pop()?;
        self.stats.dequeued(item.size());
        self.metrics.dequeued.inc();
        self.metrics.backlog(self.queue.backlog());
        Some(Dequeued { item, mark: None })
    }

    fn backlog(&self) -> Backlog {
        self.queue.backlog()
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecn::Ecn;

    fn fifo(limit: Limit) -> Fifo<u32> {
        let mut registry = Registry::default();
        Fifo::new(&mut registry, Config { limit }).unwrap()
    }

    #[test]
    fn test_order_preserved() {
        let mut fifo = fifo(Limit::default());
        for i in 0..10 {
            assert!(fifo
                .enqueue(Duration::from_millis(i as u64), Item::new(i, 100, Ecn::Ect0))
                .is_accepted());
        }

        // Long sojourn times are never penalized
        let now = Duration::from_secs(60);
        for i in 0..10 {
            let dequeued = fifo.dequeue(now).unwrap();
            assert_eq!(dequeued.item.payload(), &i);
            assert_eq!(dequeued.item.ecn(), Ecn::Ect0);
            assert_eq!(dequeued.mark, None);
        }
        assert!(fifo.dequeue(now).is_none());
        assert_eq!(fifo.stats().dequeued_bytes, 1000);
    }

    #[test]
    fn test_drop_tail() {
        let mut fifo = fifo(Limit::Packets(3));
        for i in 0..5 {
            fifo.enqueue(Duration::ZERO, Item::new(i, 100, Ecn::NotEct));
        }
        assert_eq!(fifo.backlog().packets, 3);
        assert_eq!(fifo.stats().drops(Reason::OverlimitDrop), 2);
        assert_eq!(fifo.stats().in_flight_packets(), 3);

        // The oldest packets survive
        assert_eq!(fifo.dequeue(Duration::ZERO).unwrap().item.into_payload(), 0);
    }

    #[test]
    fn test_invalid_limit() {
        let mut registry = Registry::default();
        assert_eq!(
            Fifo::<u32>::new(&mut registry, Config { limit: Limit::Bytes(0) }).err(),
            Some(Error::InvalidLimit(Limit::Bytes(0)))
        );
        assert_eq!(fifo(Limit::Bytes(1)).check_config(), Ok(()));
    }
}
