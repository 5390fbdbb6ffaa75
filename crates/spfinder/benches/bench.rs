use core::{hint::black_box, time::Duration};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use spfinder::{FanOutConfig, Resolver, ResultLine, fan_out};
use spfinder_core::ProviderId;
use std::{sync::Arc, time::Instant};
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;

// Roughly the size of the storage market participant table
const TOTAL_PROVIDERS: usize = 4096;

/// Stands in for a gateway round trip.
struct Sleepy(Duration);

impl Resolver for Sleepy {
    async fn resolve(&self, provider: &ProviderId) -> ResultLine {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
        ResultLine::resolved(provider, "12D3KooW")
    }
}

fn providers() -> Vec<ProviderId> {
    (0..TOTAL_PROVIDERS)
        .map(|i| ProviderId::new(format!("f0{}", 1000 + i)))
        .collect()
}

/// Benchmarks a full fan-out run for several worker counts.
fn bench_fan_out(c: &mut Criterion, group_name: &str, latency: Duration) {
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_PROVIDERS as u64));
    if !latency.is_zero() {
        group.sample_size(10);
    }

    let rt = Builder::new_multi_thread()
        .enable_all()
        .worker_threads(4)
        .build()
        .unwrap();

    for num_workers in [1, 8, 20, 64, 256] {
        // A single worker with latency takes minutes per iteration
        if !latency.is_zero() && num_workers == 1 {
            continue;
        }
        let config = FanOutConfig {
            num_workers,
            work_buffer_size: num_workers,
            result_buffer_size: 64,
        };
        let resolver = Arc::new(Sleepy(latency));

        group.bench_function(
            format!("elems/{}/workers/{}", TOTAL_PROVIDERS, num_workers),
            |b| {
                b.to_async(&rt).iter_custom(|iters| {
                    let config = config.clone();
                    let resolver = Arc::clone(&resolver);
                    async move {
                        let start = Instant::now();
                        for _ in 0..iters {
                            let lines = fan_out(
                                providers(),
                                Arc::clone(&resolver),
                                &config,
                                CancellationToken::new(),
                            )
                            .collect_lines()
                            .await;
                            black_box(lines);
                        }
                        start.elapsed()
                    }
                });
            },
        );
    }

    group.finish();
}

fn benchmark_fan_out_instant(c: &mut Criterion) {
    bench_fan_out(c, "fan_out/instant", Duration::ZERO);
}

fn benchmark_fan_out_1ms(c: &mut Criterion) {
    bench_fan_out(c, "fan_out/latency_1ms", Duration::from_millis(1));
}

criterion_group!(benches, benchmark_fan_out_instant, benchmark_fan_out_1ms);
criterion_main!(benches);
