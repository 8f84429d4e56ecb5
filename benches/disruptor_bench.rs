use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use shm_disruptor::{Disruptor, DisruptorConfig};

fn bench_round_trip(c: &mut Criterion) {
    let name = "disruptor_bench_rt";
    let config = DisruptorConfig {
        capacity: 1024,
        element_size: 8,
        consumer_count: 1,
        consumer_index: None,
        spin: false,
    };
    let writer = Disruptor::create(name, config).unwrap();
    let mut reader = Disruptor::attach(
        name,
        DisruptorConfig {
            consumer_index: Some(0),
            ..config
        },
    )
    .unwrap();

    let mut group = c.benchmark_group("disruptor");
    group.throughput(Throughput::Elements(1));
    group.bench_function("claim_commit_read_ack", |b| {
        let mut value = 0u64;
        b.iter(|| {
            let mut claim = writer.produce_claim().unwrap().unwrap();
            claim.bufs().0.copy_from_slice(&value.to_le_bytes());
            writer.produce_commit(&claim).unwrap();
            value = value.wrapping_add(1);

            let batch = reader.consume_new().unwrap().unwrap();
            black_box(batch.bufs().0);
            drop(batch);
            reader.consume_commit().unwrap();
        });
    });
    group.finish();

    drop(reader);
    drop(writer);
    let _ = Disruptor::unlink(name);
}

fn bench_batch_publish(c: &mut Criterion) {
    let name = "disruptor_bench_batch";
    let config = DisruptorConfig {
        capacity: 1024,
        element_size: 8,
        consumer_count: 1,
        consumer_index: None,
        spin: false,
    };
    let writer = Disruptor::create(name, config).unwrap();
    let mut reader = Disruptor::attach(
        name,
        DisruptorConfig {
            consumer_index: Some(0),
            ..config
        },
    )
    .unwrap();

    let mut group = c.benchmark_group("disruptor");
    group.throughput(Throughput::Elements(64));
    group.bench_function("claim_many_64", |b| {
        b.iter(|| {
            let mut claim = writer.produce_claim_many(64).unwrap().unwrap();
            let (head, tail) = claim.bufs();
            head.fill(0xAB);
            tail.fill(0xAB);
            writer.produce_commit(&claim).unwrap();

            let batch = reader.consume_new().unwrap().unwrap();
            black_box(batch.len());
            drop(batch);
            reader.consume_commit().unwrap();
        });
    });
    group.finish();

    drop(reader);
    drop(writer);
    let _ = Disruptor::unlink(name);
}

criterion_group!(benches, bench_round_trip, bench_batch_publish);
criterion_main!(benches);
