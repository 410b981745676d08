//! Tarball pipeline benchmarks: gzip inflate alone, then inflate plus extraction

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use husk_benchmarks::{criterion_config, npm_tarball};
use husk_cache::{decompress, unpack};

fn bench_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompress");

    for (files, size) in [(10, 1024), (100, 4096), (50, 65_536)] {
        let gz = npm_tarball(files, size);
        group.throughput(Throughput::Bytes((files * size) as u64));

        group.bench_with_input(BenchmarkId::new("files", format!("{}x{}", files, size)), &gz, |b, gz| {
            b.iter(|| black_box(decompress("bench@1.0.0", gz).expect("decompress")));
        });
    }

    group.finish();
}

fn bench_unpack(c: &mut Criterion) {
    let mut group = c.benchmark_group("unpack");
    group.sample_size(20);

    for files in [10, 100] {
        let gz = npm_tarball(files, 4096);
        group.throughput(Throughput::Elements(files as u64));

        group.bench_with_input(BenchmarkId::new("files", files), &gz, |b, gz| {
            b.iter_batched(
                || tempfile::tempdir().expect("tempdir"),
                |dir| black_box(unpack("bench@1.0.0", gz, &dir.path().join("out")).expect("unpack")),
                criterion::BatchSize::PerIteration,
            );
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_decompress, bench_unpack
}
criterion_main!(benches);
