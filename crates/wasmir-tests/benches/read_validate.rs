use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use wasmir::binary::ReadOptions;
use wasmir::ir::read_binary_ir;
use wasmir::{read_module, validate, Config};
use wasmir_tests::generated_module;

fn read_validate_bench(c: &mut Criterion) {
    let bytes = generated_module(200).unwrap();
    let config = Config::default();
    let mut group = c.benchmark_group("generated 200 funcs");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("validate only", |b| {
        b.iter(|| validate(black_box(&bytes), &config).unwrap())
    });
    group.bench_function("build ir", |b| {
        b.iter(|| read_binary_ir(black_box(&bytes), &ReadOptions::default()).unwrap())
    });
    group.bench_function("build ir and validate", |b| {
        b.iter(|| read_module(black_box(&bytes), &config).unwrap())
    });
    group.finish();
}

fn wasmparser_bench(c: &mut Criterion) {
    let bytes = generated_module(200).unwrap();
    c.bench_function("generated 200 funcs wasmparser validate", |b| {
        b.iter(|| {
            wasmparser::Validator::new()
                .validate_all(black_box(&bytes))
                .unwrap()
        })
    });
}

criterion_group!(benches, read_validate_bench, wasmparser_bench);
criterion_main!(benches);
