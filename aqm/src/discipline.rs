use crate::{codel, fifo, Error, QueueDisc};
use prometheus_client::registry::Registry;

/// Selects and configures a queue discipline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Discipline {
    /// Drop-tail FIFO.
    Fifo(fifo::Config),
    /// Controlled Delay.
    CoDel(codel::Config),
}

impl Default for Discipline {
    fn default() -> Self {
        Self::CoDel(codel::Config::default())
    }
}

impl Discipline {
    /// Name under which the discipline registers its metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fifo(_) => "fifo",
            Self::CoDel(_) => "codel",
        }
    }

    /// Construct the selected discipline, registering its metrics under [Discipline::name].
    pub fn build<P: Send + 'static>(
        self,
        registry: &mut Registry,
    ) -> Result<Box<dyn QueueDisc<P>>, Error> {
        let registry = registry.sub_registry_with_prefix(self.name());
        let mut disc: Box<dyn QueueDisc<P>> = match self {
            Self::Fifo(config) => Box::new(fifo::Fifo::new(registry, config)?),
            Self::CoDel(config) => Box::new(codel::CoDel::new(registry, config)?),
        };
        disc.check_config()?;
        disc.initialize_params();
        Ok(disc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ecn::Ecn, queue::Item, queue::Limit, stats::Reason};
    use prometheus_client::encoding::text::encode;
    use std::time::Duration;

    /// Keep a 50ms standing queue for 200ms and return the number of drops.
    fn overload(disc: &mut dyn QueueDisc<u64>) -> u64 {
        for ms in 0..200u64 {
            let now = Duration::from_millis(ms);
            disc.enqueue(now, Item::new(ms, 1000, Ecn::NotEct));
            if ms >= 50 {
                disc.dequeue(now);
            }
        }
        disc.stats().dropped_packets()
    }

    #[test]
    fn test_build() {
        let mut registry = Registry::default();
        let mut fifo = Discipline::Fifo(fifo::Config::default())
            .build::<u64>(&mut registry)
            .unwrap();
        let mut codel = Discipline::default().build::<u64>(&mut registry).unwrap();

        assert_eq!(overload(fifo.as_mut()), 0);
        assert_eq!(overload(codel.as_mut()), 1);
        assert_eq!(codel.stats().drops(Reason::TargetExceededDrop), 1);

        let mut buffer = String::new();
        encode(&mut buffer, &registry).unwrap();
        assert!(buffer.contains("fifo_enqueued_total 200"));
        assert!(buffer.contains("codel_dropped_total{reason=\"TargetExceededDrop\"} 1"));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut registry = Registry::default();
        let discipline = Discipline::CoDel(codel::Config {
            limit: Limit::Packets(0),
            ..Default::default()
        });
        assert_eq!(
            discipline.build::<u64>(&mut registry).err(),
            Some(Error::InvalidLimit(Limit::Packets(0)))
        );
    }
}
