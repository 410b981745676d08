//! Dictionary detection benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use husk_benchmarks::criterion_config;
use husk_dict::{detect, detect_named, detect_package};

const SAMPLES: &[(&str, &str)] = &[
    (
        "react",
        "import React, { useState } from 'react';\nexport function App() {\n  const [n, setN] = useState(0);\n  return <div className=\"app\" onClick={() => setN(n + 1)}>{n}</div>;\n}\n",
    ),
    (
        "typescript",
        "export interface User {\n  id: number;\n  name: string;\n}\nexport type Id = string;\nexport enum Role { Admin, User }\n",
    ),
    (
        "commonjs",
        "'use strict';\nconst path = require('path');\nmodule.exports = function resolve(p) {\n  return path.join(__dirname, p);\n};\n",
    ),
    (
        "python",
        "import os\n\nclass Greeter:\n    def greet(self, name):\n        print(name)\n\nif __name__ == '__main__':\n    Greeter().greet('x')\n",
    ),
    ("prose", "Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n"),
];

fn bench_detect_content(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_content");

    for (label, sample) in SAMPLES {
        group.throughput(Throughput::Bytes(sample.len() as u64));
        group.bench_with_input(BenchmarkId::new("sample", label), sample, |b, sample| {
            b.iter(|| black_box(detect(black_box(sample))));
        });
    }

    // Rules see at most the sampling limit, however big the input
    let bundle = "var a=function(b){return b+1},c=a(2);".repeat(4096);
    group.throughput(Throughput::Bytes(bundle.len() as u64));
    group.bench_function("minified_bundle", |b| {
        b.iter(|| black_box(detect(black_box(&bundle))));
    });

    group.finish();
}

fn bench_detect_named(c: &mut Criterion) {
    c.bench_function("detect_named_extension_hit", |b| {
        b.iter(|| black_box(detect_named(black_box("index.d.ts"), "")));
    });
}

fn bench_detect_package(c: &mut Criterion) {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path();
    std::fs::create_dir_all(root.join("lib")).expect("create lib");
    std::fs::create_dir_all(root.join("types")).expect("create types");
    for i in 0..200 {
        std::fs::write(root.join(format!("lib/m{}.js", i)), SAMPLES[2].1).expect("write js");
        std::fs::write(root.join(format!("types/m{}.d.ts", i)), SAMPLES[1].1).expect("write dts");
    }

    c.bench_function("detect_package_400_files", |b| {
        b.iter(|| black_box(detect_package(root)));
    });
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_detect_content, bench_detect_named, bench_detect_package
}
criterion_main!(benches);
