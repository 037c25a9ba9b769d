//! Argument parsing benchmarks
//!
//! Measures the keyword-argument parser and command resolution, the two
//! steps every text command goes through before its handler runs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use dismob_core::{builtin, kwargs, CommandRouter};

/// Benchmark parsing with a growing number of pairs
fn bench_parse_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("kwargs_parse");

    for pairs in [1, 4, 16, 64] {
        let input = (0..pairs)
            .map(|i| format!(r#"key{i}="value number {i}""#))
            .collect::<Vec<_>>()
            .join(" ");
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::new("pairs", pairs), &input, |b, input| {
            b.iter(|| kwargs::parse(black_box(input)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark inputs exercising escapes and error reporting
fn bench_parse_shapes(c: &mut Criterion) {
    let mut group = c.benchmark_group("kwargs_shapes");

    let cases = [
        ("unquoted", "title=News color=red channel=123"),
        ("escaped", r#"message="she said \"hi\" and left" title="a \\ b""#),
        ("error", r#"title="News" message==oops"#),
    ];

    for (name, input) in cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, input| {
            b.iter(|| {
                let _ = kwargs::parse(black_box(input));
            });
        });
    }

    group.finish();
}

/// Benchmark resolving a nested command
fn bench_resolve(c: &mut Criterion) {
    let mut router = CommandRouter::new();
    router.register_all(builtin::commands(), None).unwrap();

    c.bench_function("resolve_subcommand", |b| {
        b.iter(|| router.resolve(black_box("plugins reload ping announce")));
    });
}

criterion_group!(benches, bench_parse_pairs, bench_parse_shapes, bench_resolve);
criterion_main!(benches);
