//! The decision CoDel makes for each head packet.

use super::Config;
use crate::time::Time;

/// Configuration converted to CoDel time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Params {
    /// Acceptable standing queue delay.
    pub target: Time,
    /// Width of the window a standing queue must persist for.
    pub interval: Time,
    /// Backlog (in bytes) below which nothing is dropped.
    pub min_bytes: u32,
    /// Sojourn time above which ECN-capable packets are marked, if any.
    pub ce_threshold: Option<Time>,
}

impl From<&Config> for Params {
    fn from(config: &Config) -> Self {
        Self {
            target: Time::from(config.target),
            interval: Time::from(config.interval),
            min_bytes: config.min_bytes,
            ce_threshold: config.ce_threshold.map(Time::from),
        }
    }
}

/// Returns true if the head packet, having waited `sojourn`, may be dropped at `now`.
///
/// `backlog_bytes` is the number of bytes left in the queue once the head has been removed.
/// A packet is only droppable after the sojourn time has stayed at or above target for a full
/// interval; `first_above_time` records when that interval ends and is cleared as soon as the
/// sojourn time drops below target (or the backlog becomes too small to matter).
pub fn ok_to_drop(
    first_above_time: &mut Option<Time>,
    params: &Params,
    sojourn: Time,
    backlog_bytes: u64,
    now: Time,
) -> bool {
    if sojourn.before(params.target) || backlog_bytes < params.min_bytes as u64 {
        *first_above_time = None;
        return false;
    }
    match *first_above_time {
        None => {
            *first_above_time = Some(now + params.interval);
            false
        }
        Some(deadline) => now.after_eq(deadline),
    }
}
