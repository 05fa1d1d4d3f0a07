use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use criterion::{black_box, criterion_group, criterion_main, Criterion};

const SIZE: usize = 10_000;

// A random key iterator.
#[derive(Clone, Copy)]
struct RandomKeys {
    state: usize,
}

impl RandomKeys {
    fn new() -> Self {
        RandomKeys { state: 0 }
    }
}

impl Iterator for RandomKeys {
    type Item = usize;
    fn next(&mut self) -> Option<usize> {
        // Add 1 then multiply by some 32 bit prime.
        self.state = self.state.wrapping_add(1).wrapping_mul(3_787_392_781);
        Some(self.state)
    }
}

fn get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    group.bench_function("waitmap", |b| {
        let m = waitmap::WaitMap::<usize, usize>::new();
        for i in RandomKeys::new().take(SIZE) {
            m.set(i, i);
        }

        b.iter(|| {
            for i in RandomKeys::new().take(SIZE) {
                black_box(assert_eq!(m.get(i), &i));
            }
        });
    });

    group.bench_function("std", |b| {
        let m = Mutex::new(HashMap::<usize, usize>::default());
        for i in RandomKeys::new().take(SIZE) {
            m.lock().unwrap().insert(i, i);
        }

        b.iter(|| {
            for i in RandomKeys::new().take(SIZE) {
                black_box(assert_eq!(m.lock().unwrap().get(&i), Some(&i)));
            }
        });
    });

    group.bench_function("dashmap", |b| {
        let m = dashmap::DashMap::<usize, usize>::default();
        for i in RandomKeys::new().take(SIZE) {
            m.insert(i, i);
        }

        b.iter(|| {
            for i in RandomKeys::new().take(SIZE) {
                black_box(assert_eq!(*m.get(&i).unwrap(), i));
            }
        });
    });

    group.finish();
}

fn check(c: &mut Criterion) {
    let mut group = c.benchmark_group("check");

    group.bench_function("waitmap-hit", |b| {
        let m = waitmap::WaitMap::<usize, usize>::new();
        for i in RandomKeys::new().take(SIZE) {
            m.set(i, i);
        }

        b.iter(|| {
            for i in RandomKeys::new().take(SIZE) {
                black_box(assert!(m.check(&i)));
            }
        });
    });

    group.bench_function("waitmap-miss", |b| {
        let m = waitmap::WaitMap::<usize, usize>::new();

        b.iter(|| {
            for i in RandomKeys::new().take(SIZE) {
                black_box(assert!(!m.check(&i)));
            }
        });
    });

    group.bench_function("dashmap-hit", |b| {
        let m = dashmap::DashMap::<usize, usize>::default();
        for i in RandomKeys::new().take(SIZE) {
            m.insert(i, i);
        }

        b.iter(|| {
            for i in RandomKeys::new().take(SIZE) {
                black_box(assert!(m.contains_key(&i)));
            }
        });
    });

    group.finish();
}

fn set(c: &mut Criterion) {
    let mut group = c.benchmark_group("set");

    group.bench_function("waitmap-fresh", |b| {
        b.iter(|| {
            let m = waitmap::WaitMap::<usize, usize>::new();
            for i in RandomKeys::new().take(SIZE) {
                black_box(m.set(i, i));
            }
        });
    });

    group.bench_function("waitmap-rejected", |b| {
        let m = waitmap::WaitMap::<usize, usize>::new();
        for i in RandomKeys::new().take(SIZE) {
            m.set(i, i);
        }

        b.iter(|| {
            for i in RandomKeys::new().take(SIZE) {
                black_box(assert!(!m.set(i, i)));
            }
        });
    });

    group.bench_function("dashmap", |b| {
        b.iter(|| {
            let m = dashmap::DashMap::<usize, usize>::default();
            for i in RandomKeys::new().take(SIZE) {
                black_box(m.insert(i, i));
            }
        });
    });

    group.finish();
}

fn waited_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("waited-get");

    // Time from publishing a key to a reader already blocked on it returning.
    group.bench_function("waitmap", |b| {
        b.iter_custom(|iters| {
            let mut total = Duration::ZERO;

            for _ in 0..iters {
                let m = waitmap::WaitMap::<usize, usize>::new();

                thread::scope(|s| {
                    let reader = s.spawn(|| {
                        black_box(m.get(0));
                        Instant::now()
                    });

                    // Wait for the reader to register the key.
                    while m.is_empty() {
                        thread::yield_now();
                    }

                    let start = Instant::now();
                    m.set(0, 0);
                    total += reader.join().unwrap().duration_since(start);
                });
            }

            total
        });
    });

    // Readers arriving after the key was published on a waited entry take the fast path.
    group.bench_function("waitmap-after-wait", |b| {
        let m = waitmap::WaitMap::<usize, usize>::new();

        thread::scope(|s| {
            let reader = s.spawn(|| *m.get(0));
            while m.is_empty() {
                thread::yield_now();
            }
            m.set(0, 0);
            reader.join().unwrap();
        });

        b.iter(|| black_box(m.get(0)));
    });

    group.finish();
}

criterion_group!(benches, get, check, set, waited_get);
criterion_main!(benches);
