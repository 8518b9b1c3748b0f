//! Performance benchmarks for coalesce-rs
//!
//! Measures coordinator overhead: how much time the reservation accounting,
//! queueing, and outcome fan-out add on top of the processor itself.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tokio::runtime::Runtime;

use coalesce_rs::{Batch, BatchOutcome, Result};

async fn echo(inputs: Vec<u64>) -> Result<Vec<BatchOutcome<u64>>> {
    Ok(inputs.into_iter().map(BatchOutcome::Output).collect())
}

/// Benchmark synchronous adds followed by one run
fn bench_add_then_run(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("batch_add_then_run");

    for size in [1usize, 64, 1024] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("submissions", size), &size, |b, &size| {
            b.iter(|| {
                rt.block_on(async {
                    let batch: Batch<u64, u64> = Batch::new(echo);
                    let pending: Vec<_> = (0..size as u64).map(|n| batch.add(n)).collect();
                    let is_success = batch.run().await.unwrap();
                    let outcomes = futures::future::join_all(pending).await;
                    black_box((is_success, outcomes))
                })
            });
        });
    }

    group.finish();
}

/// Benchmark thunk-mediated adds, which exercise the reservation path
fn bench_deferred_adds(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("batch_deferred_adds");

    for size in [1usize, 64] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("thunks", size), &size, |b, &size| {
            b.iter(|| {
                rt.block_on(async {
                    let batch: Batch<u64, u64> = Batch::new(echo);
                    let thunks: Vec<_> = (0..size as u64)
                        .map(|n| {
                            batch.add_with(move |enqueuer| async move {
                                tokio::task::yield_now().await;
                                enqueuer.enqueue(n)
                            })
                        })
                        .collect();
                    let (pending, is_success) = tokio::join!(
                        futures::future::join_all(thunks),
                        batch.clone().run()
                    );
                    let outcomes = futures::future::join_all(pending).await;
                    black_box((is_success.unwrap(), outcomes))
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_add_then_run, bench_deferred_adds);
criterion_main!(benches);
