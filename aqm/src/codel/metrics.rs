use prometheus_client::{metrics::gauge::Gauge, registry::Registry};

/// Gauges tracking the state of a [super::CoDel] instance.
#[derive(Default)]
pub struct Metrics {
    pub count: Gauge,
    pub last_count: Gauge,
    pub dropping: Gauge,
    pub drop_next: Gauge,
}

impl Metrics {
    /// Create and register metrics with the given registry.
    pub fn init(registry: &mut Registry) -> Self {
        let metrics = Self::default();
        registry.register(
            "count",
            "Packets dropped or marked in the current dropping episode",
            metrics.count.clone(),
        );
        registry.register(
            "last_count",
            "Value of count when the current dropping episode started",
            metrics.last_count.clone(),
        );
        registry.register(
            "dropping",
            "Whether the discipline is in the dropping regime",
            metrics.dropping.clone(),
        );
        registry.register(
            "drop_next",
            "CoDel time of the next scheduled drop",
            metrics.drop_next.clone(),
        );
        metrics
    }
}
