use criterion::criterion_main;

mod enqueue;

criterion_main!(enqueue::benches, dequeue::benches);
