//! Throughput Benchmark for FlashRESP
//!
//! This benchmark measures the bitmap scan, the CRLF combiner and the
//! command parser over pipelined workloads.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flashresp::commands::PassThrough;
use flashresp::protocol::{CommandParser, ParsedSlot};
use flashresp::scan::{combine_crlf_into, Bitmaps, ByteClass, Kernel};

fn encode(args: &[&[u8]], out: &mut Vec<u8>) {
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
}

/// A pipeline of `count` SET commands with `value_len`-byte values.
fn set_pipeline(count: usize, value_len: usize) -> Vec<u8> {
    let value = vec![b'x'; value_len];
    let mut buf = Vec::new();
    for i in 0..count {
        let key = format!("key:{}", i);
        encode(&[b"SET", key.as_bytes(), &value], &mut buf);
    }
    buf
}

/// Benchmark the bitmap scan with every kernel
fn bench_scan(c: &mut Criterion) {
    let buf = set_pipeline(1_000, 64);

    let mut group = c.benchmark_group("scan");
    group.throughput(Throughput::Bytes(buf.len() as u64));

    let mut maps = Bitmaps::new();
    for kernel in Kernel::available() {
        group.bench_with_input(BenchmarkId::from_parameter(kernel), &buf, |b, buf| {
            b.iter(|| {
                maps.rescan(kernel, black_box(buf));
                black_box(maps.len());
            });
        });
    }

    group.finish();
}

/// Benchmark the CRLF combiner on its own
fn bench_combine(c: &mut Criterion) {
    let buf = set_pipeline(1_000, 64);
    let maps = Bitmaps::scan_with(Kernel::Scalar, &buf);
    let crs = maps.bitmap(ByteClass::Cr);
    let lfs = maps.bitmap(ByteClass::Lf);
    let mut out = vec![0u8; crs.len()];

    let mut group = c.benchmark_group("combine_crlf");
    group.throughput(Throughput::Bytes(buf.len() as u64));

    for kernel in [Kernel::Scalar, Kernel::Lanes16, Kernel::Lanes32, Kernel::Lanes64] {
        group.bench_function(BenchmarkId::from_parameter(kernel), |b| {
            b.iter(|| {
                combine_crlf_into(kernel, black_box(crs), black_box(lfs), &mut out);
                black_box(&out);
            });
        });
    }

    group.finish();
}

/// Benchmark scanning plus parsing of pipelined commands
fn bench_parse(c: &mut Criterion) {
    let parser = CommandParser::new();
    let kernel = Kernel::detect();
    let mut group = c.benchmark_group("parse");

    for (name, value_len) in [("small", 16), ("medium", 1024), ("large", 64 * 1024)] {
        let buf = set_pipeline(256, value_len);
        let mut maps = Bitmaps::new();
        let mut slots = vec![ParsedSlot::default(); 256 * 3];

        group.throughput(Throughput::Bytes(buf.len() as u64));
        group.bench_with_input(BenchmarkId::new("set", name), &buf, |b, buf| {
            b.iter(|| {
                maps.rescan(kernel, buf);
                let batch = parser.take_multiple_commands(buf, &maps, &mut slots);
                black_box(batch.commands)
            });
        });
    }

    group.finish();
}

/// Benchmark a pipeline that arrives in small reads and is reparsed each time
fn bench_incremental(c: &mut Criterion) {
    let buf = set_pipeline(64, 32);
    let parser = CommandParser::with_resolver(PassThrough);
    let kernel = Kernel::detect();

    let mut group = c.benchmark_group("incremental");
    group.throughput(Throughput::Bytes(buf.len() as u64));

    for chunk in [64usize, 512, 4096] {
        group.bench_with_input(BenchmarkId::new("chunk", chunk), &buf, |b, buf| {
            let mut maps = Bitmaps::new();
            let mut slots = vec![ParsedSlot::default(); 64];
            let mut pending = Vec::with_capacity(buf.len());
            b.iter(|| {
                pending.clear();
                let mut commands = 0;
                for piece in buf.chunks(chunk) {
                    pending.extend_from_slice(piece);
                    maps.rescan(kernel, &pending);
                    let batch = parser.take_multiple_commands(&pending, &maps, &mut slots);
                    commands += batch.commands;
                    pending.drain(..batch.bytes_consumed);
                }
                black_box(commands)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_scan,
    bench_combine,
    bench_parse,
    bench_incremental,
);

criterion_main!(benches);
