use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use term_profile::prelude::*;
use term_profile::sketches::{HllSketch, KllSketch};

fn benchmark_profile_track(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_profile_track");

    for n in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*n as u64));

        group.bench_with_input(BenchmarkId::new("integers", n), n, |b, &n| {
            b.iter(|| {
                let mut profile = ColumnProfile::new("ints");
                for i in 0..n {
                    profile.track(std::hint::black_box(i));
                }
                profile
            });
        });

        let strings: Vec<String> = (0..*n).map(|i| format!("user-{}", i % 5_000)).collect();
        group.bench_with_input(BenchmarkId::new("strings", n), &strings, |b, strings| {
            b.iter(|| {
                let mut profile = ColumnProfile::new("users");
                for s in strings {
                    profile.track(std::hint::black_box(s.as_str()));
                }
                profile
            });
        });
    }

    group.finish();
}

fn benchmark_profile_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_profile_merge");

    for partitions in [2, 8, 32].iter() {
        let profiles: Vec<ColumnProfile> = (0..*partitions)
            .map(|p| {
                let mut profile = ColumnProfile::new("values");
                for i in 0..10_000 {
                    if i % 3 == 0 {
                        profile.track(format!("k{}", (p * 10_000 + i) % 997));
                    } else {
                        profile.track((p * 10_000 + i) as f64 * 0.5);
                    }
                }
                profile
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{partitions}_partitions")),
            &profiles,
            |b, profiles| {
                b.iter(|| ColumnProfile::merge_all(profiles.clone()).unwrap());
            },
        );
    }

    group.finish();
}

fn benchmark_sketches(c: &mut Criterion) {
    let mut group = c.benchmark_group("sketch_update");
    let n = 100_000;
    group.throughput(Throughput::Elements(n as u64));

    let mut rng = rand::rng();
    let values: Vec<f64> = (0..n).map(|_| rng.random_range(-1e6..1e6)).collect();
    for k in [64u16, 200, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("kll", k), k, |b, &k| {
            b.iter(|| {
                let mut sketch = KllSketch::new(k);
                for &v in &values {
                    sketch.update(std::hint::black_box(v));
                }
                sketch
            });
        });
    }

    let keys: Vec<String> = (0..n).map(|i| i.to_string()).collect();
    for lg_k in [10u8, 12, 14].iter() {
        group.bench_with_input(BenchmarkId::new("hll", lg_k), lg_k, |b, &lg_k| {
            b.iter(|| {
                let mut sketch = HllSketch::new(lg_k);
                for key in &keys {
                    sketch.update(std::hint::black_box(key));
                }
                sketch
            });
        });
    }

    group.finish();
}

fn benchmark_serialization(c: &mut Criterion) {
    let mut profile = ColumnProfile::new("mixed");
    for i in 0..50_000 {
        match i % 4 {
            0 => profile.track(i),
            1 => profile.track(i as f64 / 7.0),
            2 => profile.track(format!("item-{}", i % 300)),
            _ => profile.track(None::<i64>),
        }
    }
    let bytes = profile.to_bytes();

    c.bench_function("profile_to_bytes", |b| b.iter(|| profile.to_bytes()));
    c.bench_function("profile_from_bytes", |b| {
        b.iter(|| ColumnProfile::from_bytes(std::hint::black_box(&bytes)).unwrap())
    });
    c.bench_function("profile_to_summary", |b| b.iter(|| profile.to_summary()));
}

criterion_group!(
    benches,
    benchmark_profile_track,
    benchmark_profile_merge,
    benchmark_sketches,
    benchmark_serialization
);
criterion_main!(benches);
