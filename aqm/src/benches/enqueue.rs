//! Admission benchmark for a full queue.

use criterion::{black_box, criterion_group, Criterion};
use netsim_aqm::{Discipline, Ecn, Item, Limit, QueueDisc};
use prometheus_client::registry::Registry;
use std::time::Duration;

/// Packets offered per iteration.
const PACKETS: u64 = 10_000;

fn bench_enqueue(c: &mut Criterion) {
    for limit in [100, 1_000] {
        for discipline in [
            Discipline::Fifo(netsim_aqm::fifo::Config {
                limit: Limit::Packets(limit),
            }),
            Discipline::CoDel(netsim_aqm::codel::Config {
                limit: Limit::Packets(limit),
                ..Default::default()
            }),
        ] {
            let label = format!(
                "{}/disc={} limit={} packets={}",
                module_path!(),
                discipline.name(),
                limit,
                PACKETS
            );
            c.bench_function(&label, |b| {
                b.iter(|| {
                    let mut registry = Registry::default();
                    let mut disc = discipline.clone().build::<u64>(&mut registry).unwrap();
                    for i in 0..PACKETS {
                        let item = Item::new(i, 1500, Ecn::NotEct);
                        black_box(disc.enqueue(Duration::from_micros(i), item));
                    }
                    disc
                });
            });
        }
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_enqueue
}
