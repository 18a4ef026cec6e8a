//! Performance benchmarks for the network speed tester
//!
//! Covers the pure parts of a run: summarizing, rendering and serializing
//! trial runs of various sizes.

use clap::Parser;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use network_speed_tester::{
    cli::Cli,
    export::{export_to_writer, load_from_reader, ExportFormat},
    models::{Config, MetricSample, TrialRun},
    output::render_table,
    stats::{StatisticsConfig, StatisticsEngine},
};

/// Create a run with `count` trials that carry every metric
fn create_sample_run(count: usize) -> TrialRun {
    TrialRun::from_samples((0..count).map(|i| {
        let i = i as f64;
        MetricSample::new(40.0 + (i * 7.3) % 25.0, 8.0 + (i * 3.1) % 6.0, 10.0 + (i * 1.7) % 9.0)
            .with_latency(12.0 + (i * 1.3) % 8.0)
            .with_jitter((i * 0.37) % 3.0)
            .with_packet_loss(if i as usize % 20 == 0 { 2.0 } else { 0.0 })
    }))
    .expect("benchmark samples are valid")
}

/// Benchmark summary statistics over growing runs
fn benchmark_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");

    for size in [5usize, 50, 500, 5000] {
        let run = create_sample_run(size);

        group.bench_with_input(BenchmarkId::new("exact_mode", size), &run, |b, run| {
            let engine = StatisticsEngine::with_defaults();
            b.iter(|| black_box(engine.summarize(black_box(run)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("rounded_mode", size), &run, |b, run| {
            let engine = StatisticsEngine::new(StatisticsConfig { mode_precision: Some(1) }).unwrap();
            b.iter(|| black_box(engine.summarize(black_box(run)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark table rendering of a summary report
fn benchmark_render_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_table");

    for size in [5usize, 500] {
        let report = StatisticsEngine::with_defaults()
            .summarize(&create_sample_run(size))
            .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &report, |b, report| {
            b.iter(|| black_box(render_table(black_box(report))));
        });
    }

    group.finish();
}

/// Benchmark export and load through in-memory buffers
fn benchmark_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");
    let run = create_sample_run(1000);

    for format in [ExportFormat::Json, ExportFormat::Csv] {
        let mut encoded = Vec::new();
        export_to_writer(&run, &mut encoded, format).unwrap();

        group.bench_function(BenchmarkId::new("export", format.as_str()), |b| {
            b.iter(|| {
                let mut buffer = Vec::with_capacity(encoded.len());
                export_to_writer(black_box(&run), &mut buffer, format).unwrap();
                black_box(buffer);
            });
        });

        group.bench_function(BenchmarkId::new("load", format.as_str()), |b| {
            b.iter(|| black_box(load_from_reader(black_box(encoded.as_slice()), format).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark configuration parsing and validation
fn benchmark_config(c: &mut Criterion) {
    let mut group = c.benchmark_group("config");

    group.bench_function("parse_cli_args", |b| {
        let args = ["nst", "--count", "10", "--server", "https://speed.example.com", "-o", "run.csv"];
        b.iter(|| black_box(Cli::try_parse_from(black_box(args)).unwrap()));
    });

    group.bench_function("validate_config", |b| {
        let config = Config::default();
        b.iter(|| black_box(config.validate()));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_summarize,
    benchmark_render_table,
    benchmark_serialization,
    benchmark_config
);

criterion_main!(benches);
