//! Hash chain over observed events, used to compare runs.

use crate::observer::{Event, Observer};
use sha2::{Digest, Sha256};
use std::{
    fmt::Write,
    sync::{Mutex, PoisonError},
};

/// Folds every [Event] it observes into a SHA-256 chain.
///
/// Two disciplines driven by the same trace must end with the same [Auditor::state].
pub struct Auditor {
    hash: Mutex<Vec<u8>>,
}

impl Default for Auditor {
    fn default() -> Self {
        Self {
            hash: Vec::new().into(),
        }
    }
}

impl Auditor {
    fn record(&self, label: &[u8], fields: &[u64]) {
        let mut hash = self.hash.lock().unwrap_or_else(PoisonError::into_inner);
        let mut hasher = Sha256::new();
        hasher.update(&*hash);
        hasher.update(label);
        for field in fields {
            hasher.update(field.to_be_bytes());
        }
        *hash = hasher.finalize().to_vec();
    }

    /// Hex encoding of the current digest (empty if nothing was observed).
    pub fn state(&self) -> String {
        let hash = self.hash.lock().unwrap_or_else(PoisonError::into_inner);
        hex(&hash)
    }
}

impl Observer for Auditor {
    fn observe(&self, event: &Event) {
        match event {
            Event::Enqueued { size } => self.record(b"enqueued", &[*size as u64]),
            Event::Dequeued { size, sojourn } => {
                self.record(b"dequeued", &[*size as u64, sojourn.as_nanos() as u64])
            }
            Event::Dropped { reason, size } => {
                self.record(b"dropped", &[*reason as u64, *size as u64])
            }
            Event::Marked { reason, size } => {
                self.record(b"marked", &[*reason as u64, *size as u64])
            }
            Event::Count { old, new } => self.record(b"count", &[*old as u64, *new as u64]),
            Event::LastCount { old, new } => {
                self.record(b"last_count", &[*old as u64, *new as u64])
            }
            Event::Dropping { old, new } => {
                self.record(b"dropping", &[*old as u64, *new as u64])
            }
            Event::DropNext { old, new } => {
                self.record(b"drop_next", &[old.raw() as u64, new.raw() as u64])
            }
        }
    }
}

/// Lowercase hex encoding of `bytes`.
fn hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
