#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use netsim_aqm::{codel, Admission, Discipline, Ecn, Item, Limit, QueueDisc};
use prometheus_client::registry::Registry;
use std::time::Duration;

#[derive(Arbitrary, Debug)]
enum Operation {
    Enqueue { advance_us: u16, size: u16, tos: u8 },
    Dequeue { advance_us: u16 },
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    limit: u16,
    bytes: bool,
    target_ms: u8,
    interval_ms: u16,
    min_bytes: u16,
    ce_threshold_us: Option<u16>,
    use_ecn: bool,
    use_l4s: bool,
    operations: Vec<Operation>,
}

fn fuzz(input: FuzzInput) {
    let limit = if input.bytes {
        Limit::Bytes(input.limit as u64)
    } else {
        Limit::Packets(input.limit as usize)
    };
    let config = codel::Config {
        limit,
        target: Duration::from_millis(input.target_ms as u64),
        interval: Duration::from_millis(input.interval_ms as u64),
        min_bytes: input.min_bytes as u32,
        ce_threshold: input.ce_threshold_us.map(|us| Duration::from_micros(us as u64)),
        use_ecn: input.use_ecn,
        use_l4s: input.use_l4s,
    };
    let mut registry = Registry::default();
    let Ok(mut disc) = Discipline::CoDel(config).build::<usize>(&mut registry) else {
        return;
    };

    let mut now = Duration::ZERO;
    let mut last_delivered = None;
    for (i, op) in input.operations.into_iter().enumerate() {
        match op {
            Operation::Enqueue {
                advance_us,
                size,
                tos,
            } => {
                now += Duration::from_micros(advance_us as u64);
                let item = Item::new(i, size as u32, Ecn::from_tos(tos));
                if let Admission::Rejected { item, .. } = disc.enqueue(now, item) {
                    assert_eq!(item.into_payload(), i);
                }
            }
            Operation::Dequeue { advance_us } => {
                now += Duration::from_micros(advance_us as u64);
                let backlog = disc.backlog();
                match disc.dequeue(now) {
                    Some(dequeued) => {
                        // Delivery is in arrival order
                        let payload = dequeued.item.into_payload();
                        if let Some(last) = last_delivered {
                            assert!(last < payload);
                        }
                        last_delivered = Some(payload);
                        assert!(disc.backlog().packets < backlog.packets);
                    }
                    None => assert_eq!(disc.backlog().packets, 0),
                }
            }
        }

        // Every packet is queued, delivered, or dropped
        let stats = disc.stats();
        let backlog = disc.backlog();
        assert_eq!(stats.in_flight_packets(), backlog.packets as u64);
        assert_eq!(stats.in_flight_bytes(), backlog.bytes);
    }
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
