//! Change notifications for external observers.
//!
//! A discipline reports every admission, delivery, drop, and mark as an [Event], along with
//! every change to its traced state. Observers only ever read: nothing they do can influence a
//! drop decision.

use crate::{stats::Reason, time::Time};
use std::time::Duration;

/// Something an [Observer] can see.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A packet was admitted.
    Enqueued { size: u32 },
    /// A packet was handed back to the caller.
    Dequeued { size: u32, sojourn: Duration },
    /// A packet was discarded.
    Dropped { reason: Reason, size: u32 },
    /// A packet was marked CE.
    Marked { reason: Reason, size: u32 },
    /// The drop count of the current episode changed.
    Count { old: u32, new: u32 },
    /// The drop count recorded at the start of the episode changed.
    LastCount { old: u32, new: u32 },
    /// The discipline entered or left the dropping regime.
    Dropping { old: bool, new: bool },
    /// The next scheduled drop instant changed.
    DropNext { old: Time, new: Time },
}

/// Receives [Event]s from a discipline.
pub trait Observer: Send + Sync {
    /// Called synchronously for every event, in the order they occur.
    fn observe(&self, event: &Event);
}

/// A value whose changes are reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Traced<T> {
    value: T,
}

impl<T: Copy + PartialEq> Traced<T> {
    /// Wrap an initial value (no change is reported for it).
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.value
    }

    /// Replace the value, returning the previous one if it differed.
    pub fn set(&mut self, value: T) -> Option<T> {
        if self.value == value {
            return None;
        }
        Some(std::mem::replace(&mut self.value, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traced_reports_changes_only() {
        let mut count = Traced::new(0u32);
        assert_eq!(count.set(0), None);
        assert_eq!(count.set(3), Some(0));
        assert_eq!(count.set(3), None);
        assert_eq!(count.set(1), Some(3));
        assert_eq!(count.get(), 1);
    }
}
