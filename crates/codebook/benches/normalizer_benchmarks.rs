//! Normalization and quality scoring benchmarks.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use codebook::input::DataTable;
use codebook::{Choice, DataDictionary, DataNormalizer, FieldDescriptor, FieldType, QualityScorer, SourceFormat};

fn dictionary() -> DataDictionary {
    let mut dict = DataDictionary::new("bench", SourceFormat::Csv);
    dict.add_field(FieldDescriptor::new("subject_id", FieldType::Identifier).with_required(true).finalize());
    dict.add_field(
        FieldDescriptor::new("age", FieldType::Integer)
            .with_rules(codebook::ValidationRules::new().with_range(Some(0.0), Some(120.0)))
            .finalize(),
    );
    dict.add_field(
        FieldDescriptor::new("arm", FieldType::Categorical)
            .with_choices(vec![Choice::new("1", "Placebo"), Choice::new("2", "Active")])
            .finalize(),
    );
    dict.add_field(FieldDescriptor::new("visit_date", FieldType::Date).finalize());
    dict.add_field(FieldDescriptor::new("email", FieldType::Email).finalize());
    dict
}

/// Raw table with a mix of clean, messy and missing cells.
fn table(rows: usize) -> DataTable {
    let rows: Vec<Vec<String>> = (0..rows)
        .map(|row| {
            vec![
                format!("S{:06}", row),
                if row % 50 == 0 { "NA".to_string() } else { format!("{}", 18 + row % 90) },
                if row % 7 == 0 { "Active".to_string() } else { (1 + row % 2).to_string() },
                if row % 3 == 0 {
                    format!("{:02}/{:02}/2022", (row % 12) + 1, (row % 28) + 1)
                } else {
                    format!("2022-{:02}-{:02}", (row % 12) + 1, (row % 28) + 1)
                },
                format!("User{}@Example.org", row),
                format!("{:.1}", row as f64 / 3.0),
            ]
        })
        .collect();
    DataTable::from_rows(["subject_id", "age", "arm", "visit_date", "email", "extra"], rows)
}

fn bench_normalize_dataset(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_dataset");
    let normalizer = DataNormalizer::new();
    let dict = dictionary();

    for rows in [1_000, 10_000] {
        let data = table(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &data, |b, data| {
            b.iter(|| normalizer.normalize_dataset(black_box(data), &dict))
        });
    }

    group.finish();
}

fn bench_quality_score(c: &mut Criterion) {
    let normalized = DataNormalizer::new().normalize_dataset(&table(10_000), &dictionary());
    let scorer = QualityScorer::new();

    c.bench_function("quality_score_10k", |b| b.iter(|| scorer.score(black_box(&normalized))));
}

criterion_group!(benches, bench_normalize_dataset, bench_quality_score);
criterion_main!(benches);
