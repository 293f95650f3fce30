//! Drop and mark accounting for a discipline.

use prometheus_client::encoding::EncodeLabelValue;
use std::{collections::BTreeMap, fmt};

/// Why a packet was dropped or marked.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, EncodeLabelValue)]
pub enum Reason {
    /// Rejected on admission because the queue was full.
    OverlimitDrop,
    /// Dropped because its sojourn time stayed above target.
    TargetExceededDrop,
    /// Marked CE instead of being dropped for exceeding target.
    TargetExceededMark,
    /// Marked CE because its sojourn time was above the CE threshold.
    CeThresholdExceededMark,
}

impl Reason {
    /// Returns true if the packet was discarded.
    pub const fn is_drop(self) -> bool {
        matches!(self, Self::OverlimitDrop | Self::TargetExceededDrop)
    }

    /// Returns true if the packet was delivered with a CE mark.
    pub const fn is_mark(self) -> bool {
        !self.is_drop()
    }

    /// Human-readable description of the reason.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OverlimitDrop => "Overlimit drop",
            Self::TargetExceededDrop => "Target exceeded drop",
            Self::TargetExceededMark => "Target exceeded mark",
            Self::CeThresholdExceededMark => "CE threshold exceeded mark",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Packet and byte counters maintained by a discipline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Packets offered to `enqueue`.
    pub received_packets: u64,
    /// Bytes offered to `enqueue`.
    pub received_bytes: u64,
    /// Packets returned by `dequeue`.
    pub dequeued_packets: u64,
    /// Bytes returned by `dequeue`.
    pub dequeued_bytes: u64,
    /// Packets rejected on admission.
    pub dropped_before_enqueue_packets: u64,
    /// Bytes rejected on admission.
    pub dropped_before_enqueue_bytes: u64,
    /// Packets discarded while dequeuing.
    pub dropped_after_dequeue_packets: u64,
    /// Bytes discarded while dequeuing.
    pub dropped_after_dequeue_bytes: u64,
    /// Packets delivered with a CE mark.
    pub marked_packets: u64,
    /// Bytes delivered with a CE mark.
    pub marked_bytes: u64,

    drops: BTreeMap<Reason, u64>,
    marks: BTreeMap<Reason, u64>,
}

impl Stats {
    /// Record a packet offered to the discipline.
    pub(crate) fn received(&mut self, size: u32) {
        self.received_packets += 1;
        self.received_bytes += size as u64;
    }

    /// Record a packet handed back to the caller.
    pub(crate) fn dequeued(&mut self, size: u32) {
        self.dequeued_packets += 1;
        self.dequeued_bytes += size as u64;
    }

    /// Record a packet rejected on admission.
    pub(crate) fn dropped_before_enqueue(&mut self, reason: Reason, size: u32) {
        self.dropped_before_enqueue_packets += 1;
        self.dropped_before_enqueue_bytes += size as u64;
        *self.drops.entry(reason).or_default() += 1;
    }

    /// Record a packet discarded from the head of the queue.
    pub(crate) fn dropped_after_dequeue(&mut self, reason: Reason, size: u32) {
        self.dropped_after_dequeue_packets += 1;
        self.dropped_after_dequeue_bytes += size as u64;
        *self.drops.entry(reason).or_default() += 1;
    }

    /// Record a CE mark.
    pub(crate) fn marked(&mut self, reason: Reason, size: u32) {
        self.marked_packets += 1;
        self.marked_bytes += size as u64;
        *self.marks.entry(reason).or_default() += 1;
    }

    /// Packets dropped for `reason`.
    pub fn drops(&self, reason: Reason) -> u64 {
        self.drops.get(&reason).copied().unwrap_or(0)
    }

    /// Packets marked for `reason`.
    pub fn marks(&self, reason: Reason) -> u64 {
        self.marks.get(&reason).copied().unwrap_or(0)
    }

    /// Total packets dropped for any reason.
    pub fn dropped_packets(&self) -> u64 {
        self.dropped_before_enqueue_packets + self.dropped_after_dequeue_packets
    }

    /// Packets that should still be queued according to these counters.
    pub fn in_flight_packets(&self) -> u64 {
        self.received_packets - self.dropped_packets() - self.dequeued_packets
    }

    /// Bytes that should still be queued according to these counters.
    pub fn in_flight_bytes(&self) -> u64 {
        self.received_bytes
            - self.dropped_before_enqueue_bytes
            - self.dropped_after_dequeue_bytes
            - self.dequeued_bytes
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "received {} ({} B), dequeued {} ({} B), dropped {} ({} before enqueue, {} after dequeue), marked {}",
            self.received_packets,
            self.received_bytes,
            self.dequeued_packets,
            self.dequeued_bytes,
            self.dropped_packets(),
            self.dropped_before_enqueue_packets,
            self.dropped_after_dequeue_packets,
            self.marked_packets,
        )?;
        for (reason, n) in self.drops.iter().chain(self.marks.iter()) {
            write!(f, "; {reason}: {n}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strings() {
        assert_eq!(Reason::OverlimitDrop.to_string(), "Overlimit drop");
        assert_eq!(Reason::TargetExceededDrop.to_string(), "Target exceeded drop");
        assert_eq!(Reason::TargetExceededMark.to_string(), "Target exceeded mark");
        assert_eq!(
            Reason::CeThresholdExceededMark.to_string(),
            "CE threshold exceeded mark"
        );
        assert!(Reason::OverlimitDrop.is_drop());
        assert!(Reason::TargetExceededDrop.is_drop());
        assert!(Reason::TargetExceededMark.is_mark());
        assert!(Reason::CeThresholdExceededMark.is_mark());
    }

    #[test]
    fn test_counters() {
        let mut stats = Stats::default();
        for _ in 0..4 {
            stats.received(100);
        }
        stats.dropped_before_enqueue(Reason::OverlimitDrop, 100);
        stats.dropped_after_dequeue(Reason::TargetExceededDrop, 100);
        stats.dequeued(100);
        stats.marked(Reason::TargetExceededMark, 100);

        assert_eq!(stats.drops(Reason::OverlimitDrop), 1);
        assert_eq!(stats.drops(Reason::TargetExceededDrop), 1);
        assert_eq!(stats.drops(Reason::TargetExceededMark), 0);
        assert_eq!(stats.marks(Reason::TargetExceededMark), 1);
        assert_eq!(stats.dropped_packets(), 2);
        assert_eq!(stats.in_flight_packets(), 1);
        assert_eq!(stats.in_flight_bytes(), 100);

        let summary = stats.to_string();
        assert!(summary.contains("Overlimit drop: 1"));
        assert!(summary.contains("Target exceeded mark: 1"));
    }
}
