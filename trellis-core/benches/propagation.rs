//! Propagation benchmarks
//!
//! Measures track/trigger throughput: fan-out of one write to many
//! subscribers, deep computed chains, and re-subscription cost for effects
//! reading many keys.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

use trellis_core::reactive::{EffectOptions, Runtime};
use trellis_core::value::{Target, Value};

fn fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    for subscribers in [1usize, 16, 256] {
        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, &subscribers| {
                let runtime = Runtime::new();
                let state = runtime.reactive(json!({ "n": 0 })).into_view().unwrap();
                let effects: Vec<_> = (0..subscribers)
                    .map(|_| {
                        let state = state.clone();
                        runtime.effect(
                            move || {
                                black_box(state.get("n"));
                            },
                            EffectOptions::new(),
                        )
                    })
                    .collect();

                let mut n = 0i64;
                b.iter(|| {
                    n += 1;
                    state.set("n", n);
                });
                drop(effects);
            },
        );
    }
    group.finish();
}

fn computed_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("computed_chain");
    for depth in [1usize, 8, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let runtime = Runtime::new();
            let state = runtime.reactive(json!({ "n": 0 })).into_view().unwrap();

            let root = {
                let state = state.clone();
                runtime.computed(move || state.get("n").as_i64().unwrap_or(0))
            };
            let mut tail = root;
            for _ in 0..depth {
                let prev = tail.clone();
                tail = runtime.computed(move || prev.get() + 1);
            }

            let mut n = 0i64;
            b.iter(|| {
                n += 1;
                state.set("n", n);
                black_box(tail.get())
            });
        });
    }
    group.finish();
}

fn wide_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_read");
    for keys in [8usize, 128] {
        group.throughput(Throughput::Elements(keys as u64));
        group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, &keys| {
            let runtime = Runtime::new();
            let raw = Target::from_values((0..keys).map(|i| Value::from(i)));
            let list = runtime.reactive(raw).into_view().unwrap();
            let effect = {
                let list = list.clone();
                runtime.effect(
                    move || {
                        for value in list.values() {
                            black_box(value);
                        }
                    },
                    EffectOptions::new(),
                )
            };

            b.iter(|| effect.run());
        });
    }
    group.finish();
}

criterion_group!(benches, fan_out, computed_chain, wide_read);
criterion_main!(benches);
