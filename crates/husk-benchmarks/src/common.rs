//! Common utilities for benchmarks

use std::io::Write;
use std::time::Duration;

use criterion::Criterion;
use flate2::write::GzEncoder;
use flate2::Compression;
use husk_core::types::Version;
use pprof::criterion::{Output, PProfProfiler};

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(Duration::from_secs(2))
        .measurement_time(Duration::from_secs(5))
        .sample_size(50)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// A realistic publish history: majors, minors, patches and a few prereleases
pub fn published_versions(count: usize) -> Vec<Version> {
    (0..count)
        .map(|i| {
            let mut version = Version::new((i / 100) as u64, ((i / 10) % 10) as u64, (i % 10) as u64);
            if i % 17 == 0 {
                version.prerelease = Some(format!("beta.{}", i % 5));
            }
            version
        })
        .collect()
}

/// Ranges as they show up in real manifests
pub const RANGES: &[&str] = &[
    "^1.2.3",
    "~0.4.0",
    ">=1.0.0 <2.0.0",
    "1.x",
    "*",
    "^0.0.7",
    "1.2.3 - 2.3.4",
    ">=2.1.0-beta.0 <3",
    "^1 || ^2 || ^3",
    "=3.4.5",
];

/// Gzipped npm-style tarball with `files` text files of `file_size` bytes each
pub fn npm_tarball(files: usize, file_size: usize) -> Vec<u8> {
    let body = "module.exports = function () { return 42; };\n"
        .repeat(file_size / 46 + 1)
        .into_bytes();
    let body = &body[..file_size];

    let mut builder = tar::Builder::new(Vec::new());
    for i in 0..files {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, format!("package/lib/file-{}.js", i), body)
            .expect("append tar entry");
    }
    let tar_bytes = builder.into_inner().expect("finish tar");

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes).expect("gzip tarball");
    encoder.finish().expect("finish gzip")
}
