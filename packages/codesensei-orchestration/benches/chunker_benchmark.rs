//! Benchmarks for chunking throughput
//!
//! Run with: cargo bench --bench chunker_benchmark

use codesensei_orchestration::{Chunker, FileUnit};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Generate a TypeScript module with N exported functions
fn generate_ts_functions(count: usize) -> String {
    (0..count)
        .map(|i| {
            format!(
                r#"export function handler_{i}(req: Request): Response {{
  const body = {{ id: {i}, label: "brace }} in string" }};
  // {{ ignored
  return respond(body);
}}

"#
            )
        })
        .collect()
}

/// Generate a TypeScript class with N methods
fn generate_ts_class(methods: usize) -> String {
    let body: String = (0..methods)
        .map(|j| format!("  method_{j}(x: number) {{\n    return x * {j};\n  }}\n"))
        .collect();
    format!("export class Service {{\n{body}}}\n")
}

fn bench_chunk_single_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_single_file");
    let chunker = Chunker::default();

    for size in [10, 100, 1000].iter() {
        let file = FileUnit::from_path("src/handlers.ts", generate_ts_functions(*size));

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &file, |b, file| {
            b.iter(|| chunker.chunk_file(black_box(file)));
        });
    }

    group.finish();
}

fn bench_chunk_repository(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_repository");
    let chunker = Chunker::default();

    for file_count in [10, 100, 500].iter() {
        let files: Vec<FileUnit> = (0..*file_count)
            .map(|i| {
                if i % 2 == 0 {
                    FileUnit::from_path(format!("src/mod_{i}.ts"), generate_ts_functions(20))
                } else {
                    FileUnit::from_path(format!("src/svc_{i}.ts"), generate_ts_class(30))
                }
            })
            .collect();

        group.throughput(Throughput::Elements(*file_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(file_count), &files, |b, files| {
            b.iter(|| chunker.chunk(black_box(files)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_chunk_single_file, bench_chunk_repository);
criterion_main!(benches);
