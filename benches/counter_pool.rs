/// Counter pool benchmarks
///
/// Measures block-frame push/pop through the recycling pool against plain
/// heap allocation of counter sets.
use bytesflops::block_stack::BlockStack;
use bytesflops::pool::{CounterPool, PoolConfig};
use bytesflops::CounterSet;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

/// Benchmark: Direct heap allocation (baseline)
fn bench_heap_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap_allocation");
    group.measurement_time(Duration::from_secs(5));
    group.throughput(Throughput::Elements(1000));

    group.bench_function("alloc_1000_frames", |b| {
        b.iter(|| {
            let mut frames = Vec::with_capacity(1000);
            for _ in 0..1000 {
                frames.push(Box::<CounterSet>::default());
            }
            black_box(frames);
        });
    });

    group.finish();
}

/// Benchmark: Pool allocate/deallocate cycle
fn bench_pool_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_cycle");
    group.measurement_time(Duration::from_secs(5));
    group.throughput(Throughput::Elements(1));

    group.bench_function("allocate_deallocate", |b| {
        let mut pool = CounterPool::new(PoolConfig::new(64));
        b.iter(|| {
            let frame = pool.allocate();
            black_box(&frame);
            pool.deallocate(frame);
        });
    });

    group.bench_function("allocate_deallocate_disabled", |b| {
        let mut pool = CounterPool::new(PoolConfig::disabled());
        b.iter(|| {
            let frame = pool.allocate();
            black_box(&frame);
            pool.deallocate(frame);
        });
    });

    group.finish();
}

/// Benchmark: Block stack push/pop at different call depths
fn bench_call_depths(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_stack_depth");
    group.measurement_time(Duration::from_secs(5));

    for depth in [1usize, 4, 16, 64].iter() {
        group.throughput(Throughput::Elements(*depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, &depth| {
            let mut stack = BlockStack::new(CounterPool::new(PoolConfig::new(depth + 1)));
            b.iter(|| {
                for _ in 0..depth {
                    stack.push();
                }
                for _ in 0..depth {
                    stack.pop();
                }
                black_box(stack.depth());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_heap_allocation,
    bench_pool_cycle,
    bench_call_depths
);
criterion_main!(benches);
