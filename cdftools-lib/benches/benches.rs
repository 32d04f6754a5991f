use std::path::PathBuf;

use cdftools::{skeleton::Skeleton, timecode};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap());
    path.push("tests/fixtures");
    path.push(name);
    path
}

fn bench_text_skeleton(c: &mut Criterion) {
    let text = std::fs::read_to_string(fixture_path("sample.skt")).unwrap();
    let skeleton = Skeleton::from_text(&text).unwrap();

    let mut group = c.benchmark_group("text");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("read", |b| {
        b.iter(|| Skeleton::from_text(&text).unwrap());
    });
    group.bench_function("write", |b| {
        b.iter(|| skeleton.to_text().unwrap());
    });
    group.finish();
}

fn bench_tabular_skeleton(c: &mut Criterion) {
    let skeleton = Skeleton::from_text_file(fixture_path("sample.skt")).unwrap();
    let workbook = skeleton.to_tabular();

    let mut group = c.benchmark_group("tabular");
    group.bench_function("read", |b| {
        b.iter(|| Skeleton::from_tabular(&workbook, Default::default()).unwrap());
    });
    group.bench_function("write", |b| {
        b.iter(|| skeleton.to_tabular());
    });
    group.finish();
}

fn bench_timecode(c: &mut Criterion) {
    let cds = hex::decode("56d703a4ec90").unwrap();
    let ccs = hex::decode("07e20b0d103b000b1621").unwrap();
    let cuc = hex::decode("727d6154").unwrap();

    let mut group = c.benchmark_group("timecode");
    group.bench_function("cuc", |b| {
        b.iter(|| timecode::decode(0b0011_0010, &cuc, None).unwrap());
    });
    group.bench_function("cds", |b| {
        b.iter(|| timecode::decode(0b0000_1000, &cds, None).unwrap());
    });
    group.bench_function("ccs", |b| {
        b.iter(|| timecode::decode(0b0110_1010, &ccs, None).unwrap());
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_text_skeleton,
    bench_tabular_skeleton,
    bench_timecode
);
criterion_main!(benches);
