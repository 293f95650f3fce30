use super::{
    law::{ok_to_drop, Params},
    metrics, Config,
};
use crate::{
    fixed::{control_law, RecInvSqrt},
    metrics::Metrics,
    observer::{Event, Observer, Traced},
    queue::{Backlog, Item, Queue},
    stats::{Reason, Stats},
    time::Time,
    Admission, Dequeued, Error, QueueDisc,
};
use prometheus_client::registry::Registry;
use std::{sync::Arc, time::Duration};
use tracing::{debug, trace};

/// Number of intervals after which a previous episode's drop rate is forgotten.
const REENTRY_INTERVALS: u32 = 16;

/// The Controlled Delay queue discipline.
pub struct CoDel<P> {
    config: Config,
    params: Params,
    queue: Queue<P>,
    stats: Stats,

    dropping: Traced<bool>,
    first_above_time: Option<Time>,
    drop_next: Traced<Time>,
    count: Traced<u32>,
    last_count: Traced<u32>,
    rec_inv_sqrt: RecInvSqrt,

    observers: Vec<Arc<dyn Observer>>,
    metrics: Metrics,
    codel_metrics: metrics::Metrics,
}

impl<P> CoDel<P> {
    /// Create a new [CoDel] discipline, registering its metrics with `registry`.
    pub fn new(registry: &mut Registry, config: Config) -> Result<Self, Error> {
        config.validate()?;
        let disc = Self {
            params: Params::from(&config),
            queue: Queue::new(config.limit),
            stats: Stats::default(),
            dropping: Traced::new(false),
            first_above_time: None,
            drop_next: Traced::new(Time::ZERO),
            count: Traced::new(0),
            last_count: Traced::new(0),
            rec_inv_sqrt: RecInvSqrt::MAX,
            observers: Vec::new(),
            metrics: Metrics::init(registry),
            codel_metrics: metrics::Metrics::init(registry),
            config,
        };
        debug!(config = ?disc.config, "created codel");
        Ok(disc)
    }

    /// Attach an observer that will see every subsequent [Event].
    pub fn observe(&mut self, observer: Arc<dyn Observer>) {
        self.observers.push(observer);
    }

    /// The configuration this discipline was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Target queue delay.
    pub fn target(&self) -> Duration {
        self.config.target
    }

    /// Interval a standing queue must persist for before dropping starts.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Raw CoDel time of the next scheduled drop.
    pub fn drop_next(&self) -> u32 {
        self.drop_next.get().raw()
    }

    /// Drops (or marks) in the current episode.
    pub fn count(&self) -> u32 {
        self.count.get()
    }

    /// Value of `count` recorded when the current episode started.
    pub fn last_count(&self) -> u32 {
        self.last_count.get()
    }

    /// Returns true while in the dropping regime.
    pub fn dropping(&self) -> bool {
        self.dropping.get()
    }

    /// Current estimate of `1/sqrt(count)`.
    pub fn rec_inv_sqrt(&self) -> RecInvSqrt {
        self.rec_inv_sqrt
    }

    fn emit(&self, event: Event) {
        for observer in &self.observers {
            observer.observe(&event);
        }
    }

    fn set_dropping(&mut self, new: bool) {
        if let Some(old) = self.dropping.set(new) {
            self.codel_metrics.dropping.set(new as i64);
            debug!(
                dropping = new,
                count = self.count.get(),
                last_count = self.last_count.get(),
                drop_next = %self.drop_next.get(),
                "dropping state changed"
            );
            self.emit(Event::Dropping { old, new });
        }
    }

    fn set_drop_next(&mut self, new: Time) {
        if let Some(old) = self.drop_next.set(new) {
            self.codel_metrics.drop_next.set(new.raw() as i64);
            self.emit(Event::DropNext { old, new });
        }
    }

    fn set_count(&mut self, new: u32) {
        if let Some(old) = self.count.set(new) {
            self.codel_metrics.count.set(new as i64);
            self.emit(Event::Count { old, new });
        }
    }

    fn set_last_count(&mut self, new: u32) {
        if let Some(old) = self.last_count.set(new) {
            self.codel_metrics.last_count.set(new as i64);
            self.emit(Event::LastCount { old, new });
        }
    }

    /// Try to mark `item` CE, returning false if it must be dropped instead.
    fn mark(&mut self, item: &mut Item<P>, reason: Reason, sojourn: Time) -> bool {
        if !item.mark() {
            return false;
        }
        trace!(?reason, size = item.size(), %sojourn, "marked");
        self.stats.marked(reason, item.size());
        self.metrics.record_mark(reason);
        self.emit(Event::Marked {
            reason,
            size: item.size(),
        });
        true
    }

    /// Discard a packet already removed from the head of the queue.
    fn drop_after_dequeue(&mut self, item: Item<P>, sojourn: Time) {
        let reason = Reason::TargetExceededDrop;
        trace!(?reason, size = item.size(), %sojourn, "dropped");
        self.stats.dropped_after_dequeue(reason, item.size());
        self.metrics.record_drop(reason);
        self.emit(Event::Dropped {
            reason,
            size: item.size(),
        });
    }

    /// Remove the head of the queue and return it with its sojourn time.
    fn pop(&mut self, now: Duration) -> Option<(Item<P>, Time)> {
        let item = self.queue.pop()?;
        let sojourn = Time::from(item.sojourn(now));
        Some((item, sojourn))
    }

    fn ok_to_drop(&mut self, sojourn: Time, now: Time) -> bool {
        ok_to_drop(
            &mut self.first_above_time,
            &self.params,
            sojourn,
            self.queue.bytes(),
            now,
        )
    }

    fn deliver(&mut self, now: Duration, item: Item<P>, mark: Option<Reason>) -> Dequeued<P> {
        self.stats.dequeued(item.size());
        self.metrics.dequeued.inc();
        self.metrics.backlog(self.queue.backlog());
        self.emit(Event::Dequeued {
            size: item.size(),
            sojourn: item.sojourn(now),
        });
        Dequeued { item, mark }
    }

    fn is_l4s(&self, item: &Item<P>) -> bool {
        self.config.use_l4s && item.ecn().is_l4s()
    }

    /// Deliver low-latency traffic, which is never dropped and only marked above the CE threshold.
    fn deliver_l4s(&mut self, now: Duration, mut item: Item<P>, sojourn: Time) -> Dequeued<P> {
        let mut mark = None;
        if let Some(threshold) = self.params.ce_threshold {
            if sojourn.after(threshold)
                && self.mark(&mut item, Reason::CeThresholdExceededMark, sojourn)
            {
                mark = Some(Reason::CeThresholdExceededMark);
            }
        }
        self.deliver(now, item, mark)
    }

    /// Called when the queue has been found (or made) empty by [CoDel::dequeue].
    fn empty(&mut self) -> Option<Dequeued<P>> {
        self.metrics.backlog(self.queue.backlog());
        None
    }
}

impl<P: Send> QueueDisc<P> for CoDel<P> {
    fn check_config(&self) -> Result<(), Error> {
        self.config.validate()
    }

    fn initialize_params(&mut self) {
        self.params = Params::from(&self.config);
        self.first_above_time = None;
        self.rec_inv_sqrt = RecInvSqrt::MAX;
        self.set_dropping(false);
        self.set_drop_next(Time::ZERO);
        self.set_count(0);
        self.set_last_count(0);
    }

    fn enqueue(&mut self, now: Duration, item: Item<P>) -> Admission<P> {
        let size = item.size();
        self.stats.received(size);
        if self.queue.exceeds(size) {
            let reason = Reason::OverlimitDrop;
            trace!(?reason, size, limit = %self.queue.limit(), "rejected");
            self.stats.dropped_before_enqueue(reason, size);
            self.metrics.record_drop(reason);
            self.emit(Event::Dropped { reason, size });
            return Admission::Rejected { reason, item };
        }
        self.queue.push(now, item);
        self.metrics.enqueued.inc();
        self.metrics.backlog(self.queue.backlog());
        self.emit(Event::Enqueued { size });
        Admission::Accepted
    }

    fn dequeue(&mut self, now: Duration) -> Option<Dequeued<P>> {
        let Some((mut item, mut sojourn)) = self.pop(now) else {
            self.set_dropping(false);
            return self.empty();
        };
        let now_t = Time::from(now);
        let mut ok = self.ok_to_drop(sojourn, now_t);

        if self.is_l4s(&item) {
            return Some(self.deliver_l4s(now, item, sojourn));
        }

        let mut mark = None;
        if self.dropping.get() {
            if !ok {
                self.set_dropping(false);
            } else {
                while self.dropping.get() && now_t.after_eq(self.drop_next.get()) {
                    let count = self.count.get().wrapping_add(1);
                    self.set_count(count);
                    self.rec_inv_sqrt = self.rec_inv_sqrt.newton_step(count);

                    if self.config.use_ecn
                        && self.mark(&mut item, Reason::TargetExceededMark, sojourn)
                    {
                        mark = Some(Reason::TargetExceededMark);
                        let next = control_law(
                            self.drop_next.get(),
                            self.params.interval,
                            self.rec_inv_sqrt,
                        );
                        self.set_drop_next(next);
                        break;
                    }

                    self.drop_after_dequeue(item, sojourn);
                    let Some(next) = self.pop(now) else {
                        self.first_above_time = None;
                        self.set_dropping(false);
                        return self.empty();
                    };
                    (item, sojourn) = next;
                    ok = self.ok_to_drop(sojourn, now_t);
                    if !ok {
                        self.set_dropping(false);
                    } else {
                        let next = control_law(
                            self.drop_next.get(),
                            self.params.interval,
                            self.rec_inv_sqrt,
                        );
                        self.set_drop_next(next);
                    }
                    if self.is_l4s(&item) {
                        return Some(self.deliver_l4s(now, item, sojourn));
                    }
                }
            }
        } else if ok {
            let head = if self.config.use_ecn
                && self.mark(&mut item, Reason::TargetExceededMark, sojourn)
            {
                mark = Some(Reason::TargetExceededMark);
                Some((item, sojourn))
            } else {
                self.drop_after_dequeue(item, sojourn);
                let next = self.pop(now);
                if let Some((_, sojourn)) = next {
                    self.ok_to_drop(sojourn, now_t);
                }
                next
            };
            self.set_dropping(true);

            // Resume near the previous drop rate if the last episode ended recently
            let delta = self.count.get().wrapping_sub(self.last_count.get());
            let since = now_t - self.drop_next.get();
            if delta > 1 && since.before(self.params.interval * REENTRY_INTERVALS) {
                self.set_count(delta);
                self.rec_inv_sqrt = self.rec_inv_sqrt.newton_step(delta);
            } else {
                self.set_count(1);
                self.rec_inv_sqrt = RecInvSqrt::MAX;
            }
            self.set_last_count(self.count.get());
            let next = control_law(now_t, self.params.interval, self.rec_inv_sqrt);
            self.set_drop_next(next);

            let Some(next) = head else {
                return self.empty();
            };
            (item, sojourn) = next;
            if mark.is_none() && self.is_l4s(&item) {
                return Some(self.deliver_l4s(now, item, sojourn));
            }
        }

        if mark.is_none() && self.config.use_ecn {
            if let Some(threshold) = self.params.ce_threshold {
                if sojourn.after(threshold)
                    && self.mark(&mut item, Reason::CeThresholdExceededMark, sojourn)
                {
                    mark = Some(Reason::CeThresholdExceededMark);
                }
            }
        }
        Some(self.deliver(now, item, mark))
    }

    fn backlog(&self) -> Backlog {
        self.queue.backlog()
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}
