//! Metrics shared by every discipline.

use crate::{queue::Backlog, stats::Reason};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};

/// Label attached to drop and mark counters.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct Label {
    pub reason: Reason,
}

impl Label {
    pub const fn new(reason: Reason) -> Self {
        Self { reason }
    }
}

/// Metrics for a [crate::QueueDisc].
#[derive(Default)]
pub struct Metrics {
    /// Packets admitted.
    pub enqueued: Counter,
    /// Packets delivered.
    pub dequeued: Counter,
    /// Packets dropped, by reason.
    pub dropped: Family<Label, Counter>,
    /// Packets marked, by reason.
    pub marked: Family<Label, Counter>,
    /// Bytes queued.
    pub backlog_bytes: Gauge,
    /// Packets queued.
    pub backlog_packets: Gauge,
}

impl Metrics {
    /// Create and register metrics with the given registry.
    pub fn init(registry: &mut Registry) -> Self {
        let metrics = Self::default();
        registry.register("enqueued", "Packets admitted", metrics.enqueued.clone());
        registry.register("dequeued", "Packets delivered", metrics.dequeued.clone());
        registry.register(
            "dropped",
            "Packets dropped by reason",
            metrics.dropped.clone(),
        );
        registry.register("marked", "Packets marked by reason", metrics.marked.clone());
        registry.register(
            "backlog_bytes",
            "Bytes queued",
            metrics.backlog_bytes.clone(),
        );
        registry.register(
            "backlog_packets",
            "Packets queued",
            metrics.backlog_packets.clone(),
        );
        metrics
    }

    /// Record a drop.
    pub fn record_drop(&self, reason: Reason) {
        self.dropped.get_or_create(&Label::new(reason)).inc();
    }

    /// Record a mark.
    pub fn record_mark(&self, reason: Reason) {
        self.marked.get_or_create(&Label::new(reason)).inc();
    }

    /// Publish the current occupancy.
    pub fn backlog(&self, backlog: Backlog) {
        self.backlog_bytes.set(backlog.bytes as i64);
        self.backlog_packets.set(backlog.packets as i64);
    }
}
