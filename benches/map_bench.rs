use chainmap::{ChainMap, Options, OrderMode, StripedMap};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn bench_put_fresh_100k(c: &mut Criterion) {
    c.bench_function("chain::put_fresh_100k", |b| {
        b.iter_batched(
            ChainMap::<String, u64>::new,
            |mut m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    let _ = m.put(Some(key(x)), i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_put_insertion_order_100k(c: &mut Criterion) {
    c.bench_function("chain::put_insertion_order_100k", |b| {
        b.iter_batched(
            || ChainMap::<String, u64>::with_options(Options::new().order(OrderMode::Insertion)),
            |mut m| {
                for (i, x) in lcg(2).take(100_000).enumerate() {
                    let _ = m.put(Some(key(x)), i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_peek_hit_10k(c: &mut Criterion) {
    c.bench_function("chain::peek_hit_10k_on_100k", |b| {
        let mut m = ChainMap::new();
        let keys: Vec<_> = lcg(7).take(100_000).map(key).collect();
        for (i, k) in keys.iter().enumerate() {
            let _ = m.put(Some(k.clone()), i as u64).unwrap();
        }
        // Precompute 10k random query keys using LCG
        let n = keys.len();
        let mut s = 0x9e3779b97f4a7c15u64;
        let queries: Vec<String> = (0..10_000)
            .map(|_| {
                s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                keys[(s as usize) % n].clone()
            })
            .collect();
        b.iter(|| {
            for k in &queries {
                black_box(m.peek(Some(k.as_str())).unwrap());
            }
        })
    });
}

fn bench_peek_miss_10k(c: &mut Criterion) {
    c.bench_function("chain::peek_miss_10k_on_100k", |b| {
        let mut m = ChainMap::new();
        for (i, x) in lcg(11).take(100_000).enumerate() {
            let _ = m.put(Some(key(x)), i as u64).unwrap();
        }
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            for _ in 0..10_000 {
                let k = key(miss.next().unwrap());
                black_box(m.peek(Some(k.as_str())).unwrap());
            }
        })
    });
}

fn bench_access_order_get_10k(c: &mut Criterion) {
    c.bench_function("chain::access_order_get_10k_on_100k", |b| {
        b.iter_batched(
            || {
                let mut m =
                    ChainMap::with_options(Options::new().order(OrderMode::Access));
                let keys: Vec<_> = lcg(13).take(100_000).map(key).collect();
                for (i, k) in keys.iter().enumerate() {
                    let _ = m.put(Some(k.clone()), i as u64).unwrap();
                }
                let n = keys.len();
                let mut s = 0x9e3779b97f4a7c15u64;
                let queries: Vec<String> = (0..10_000)
                    .map(|_| {
                        s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                        keys[(s as usize) % n].clone()
                    })
                    .collect();
                (m, queries)
            },
            |(mut m, queries)| {
                for k in &queries {
                    black_box(m.get(Some(k.as_str())).unwrap());
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_iter_all_100k(c: &mut Criterion) {
    c.bench_function("chain::iter_all_100k", |b| {
        let mut m = ChainMap::new();
        for (i, x) in lcg(999).take(100_000).enumerate() {
            let _ = m.put(Some(key(x)), i as u64).unwrap();
        }
        b.iter(|| {
            let mut sum = 0u64;
            for (_k, v) in m.iter() {
                sum = sum.wrapping_add(*v);
            }
            black_box(sum)
        })
    });
}

fn bench_striped_put_100k(c: &mut Criterion) {
    c.bench_function("striped::put_fresh_100k_single_thread", |b| {
        b.iter_batched(
            StripedMap::<String, u64>::new,
            |m| {
                for (i, x) in lcg(17).take(100_000).enumerate() {
                    let _ = m.put(Some(key(x)), i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_striped_put_contended(c: &mut Criterion) {
    c.bench_function("striped::put_100k_8_threads", |b| {
        b.iter_batched(
            StripedMap::<String, u64>::new,
            |m| {
                std::thread::scope(|s| {
                    for t in 0..8u64 {
                        let m = &m;
                        s.spawn(move || {
                            for (i, x) in lcg(t + 1).take(12_500).enumerate() {
                                let _ = m.put(Some(key(x)), i as u64).unwrap();
                            }
                        });
                    }
                });
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_striped_get_10k(c: &mut Criterion) {
    c.bench_function("striped::get_hit_10k_on_100k", |b| {
        let m = StripedMap::new();
        let keys: Vec<_> = lcg(23).take(100_000).map(key).collect();
        for (i, k) in keys.iter().enumerate() {
            let _ = m.put(Some(k.clone()), i as u64).unwrap();
        }
        let n = keys.len();
        let mut s = 0x9e3779b97f4a7c15u64;
        let queries: Vec<String> = (0..10_000)
            .map(|_| {
                s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                keys[(s as usize) % n].clone()
            })
            .collect();
        b.iter(|| {
            for k in &queries {
                black_box(m.get(Some(k.as_str())).unwrap());
            }
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_chain;
    config = bench_config();
    targets = bench_put_fresh_100k,
              bench_put_insertion_order_100k,
              bench_peek_hit_10k,
              bench_peek_miss_10k,
              bench_access_order_get_10k,
              bench_iter_all_100k
}
criterion_group! {
    name = benches_striped;
    config = bench_config();
    targets = bench_striped_put_100k,
              bench_striped_put_contended,
              bench_striped_get_10k
}
criterion_main!(benches_chain, benches_striped);
