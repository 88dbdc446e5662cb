//! Statistical field detection benchmarks.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use codebook::StatisticalFieldDetector;
use codebook::detection::welch_t_test;
use codebook::input::DataTable;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Cohort with anchors and a handful of cryptic binary columns.
fn cohort(rows: usize, seed: u64) -> DataTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut columns: Vec<(String, Vec<String>)> = ["age", "height", "weight", "hgb", "s_01", "q2", "q3", "flag_a"]
        .iter()
        .map(|name| (name.to_string(), Vec::with_capacity(rows)))
        .collect();

    for _ in 0..rows {
        let male = rng.gen_bool(0.5);
        let offset = if male { 1.0 } else { 0.0 };
        let row = [
            format!("{}", rng.gen_range(18..90)),
            format!("{:.1}", 163.0 + 12.0 * offset + rng.gen_range(-10.0..10.0)),
            format!("{:.1}", 68.0 + 15.0 * offset + rng.gen_range(-15.0..15.0)),
            format!("{:.1}", 13.0 + 2.0 * offset + rng.gen_range(-1.5..1.5)),
            if male { "1" } else { "2" }.to_string(),
            if rng.gen_bool(0.1) { "Y" } else { "N" }.to_string(),
            if rng.gen_bool(0.5) { "A" } else { "B" }.to_string(),
            rng.gen_range(0..4).to_string(),
        ];
        for ((_, values), cell) in columns.iter_mut().zip(row) {
            values.push(cell);
        }
    }

    DataTable::from_columns(columns)
}

fn bench_detect_field_types(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_field_types");
    let detector = StatisticalFieldDetector::new();

    for rows in [500, 5_000] {
        let data = cohort(rows, 11);
        group.bench_with_input(BenchmarkId::new("rows", rows), &data, |b, data| {
            b.iter(|| detector.detect_field_types(black_box(data)))
        });
    }

    group.finish();
}

fn bench_welch_t_test(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(5);
    let a: Vec<f64> = (0..1_000).map(|_| rng.gen_range(150.0..180.0)).collect();
    let b: Vec<f64> = (0..1_000).map(|_| rng.gen_range(160.0..190.0)).collect();

    c.bench_function("welch_t_test_1k", |bench| bench.iter(|| welch_t_test(black_box(&a), black_box(&b))));
}

criterion_group!(benches, bench_detect_field_types, bench_welch_t_test);
criterion_main!(benches);
