//! Field detection tests on synthetic clinical cohorts.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use codebook::detection::{DetectorConfig, StatisticalFieldDetector};
use codebook::input::DataTable;
use codebook::SemanticType;

const ROWS: usize = 200;

/// Standard normal draw (Box-Muller).
fn normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.r#gen::<f64>();
    let u2: f64 = rng.r#gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Cohort with a cryptic sex column (`s_01`), a cryptic death flag (`d_1`)
/// and an unrelated coin-flip column (`x_7`).
fn synthetic_cohort(seed: u64) -> DataTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut columns: Vec<(String, Vec<String>)> = ["patient_id", "age", "height_cm", "weight_kg", "hemoglobin", "s_01", "d_1", "x_7"]
        .iter()
        .map(|name| (name.to_string(), Vec::with_capacity(ROWS)))
        .collect();

    for i in 0..ROWS {
        let male = rng.gen_bool(0.5);
        let dead = i % 25 == 0;
        let offset = if male { 1.0 } else { 0.0 };

        let age = if dead { 80.0 + 5.0 * normal(&mut rng) } else { 50.0 + 10.0 * normal(&mut rng) };
        let height = 163.0 + 12.0 * offset + 7.0 * normal(&mut rng);
        let weight = 68.0 + 15.0 * offset + 10.0 * normal(&mut rng);
        let hemoglobin = 13.0 + 2.0 * offset + normal(&mut rng);

        let row = [
            format!("P{:04}", i + 1),
            format!("{:.0}", age),
            format!("{:.1}", height),
            format!("{:.1}", weight),
            format!("{:.1}", hemoglobin),
            if male { "1" } else { "0" }.to_string(),
            if dead { "1" } else { "0" }.to_string(),
            if rng.gen_bool(0.5) { "A" } else { "B" }.to_string(),
        ];
        for ((_, values), cell) in columns.iter_mut().zip(row) {
            values.push(cell);
        }
    }

    DataTable::from_columns(columns)
}

#[test]
fn test_detects_sex_from_body_measurements() {
    let table = synthetic_cohort(42);
    let results = StatisticalFieldDetector::new().detect_field_types(&table);

    let sex = results
        .iter()
        .find(|r| r.field_name == "s_01")
        .expect("s_01 should be detected");
    assert_eq!(sex.predicted_type, SemanticType::Sex);
    assert!(sex.confidence >= 0.7, "confidence {}", sex.confidence);

    let height = &sex.statistical_tests["height"];
    assert!(height.significant);
    assert!(height.group_difference > 5.0);
    assert!(sex.correlations["hemoglobin"] > 0.3);
    assert_eq!(sex.evidence.unique_values, vec!["0", "1"]);
    assert_eq!(sex.evidence.sample_size, ROWS);
}

#[test]
fn test_detects_vital_status_and_orders_by_confidence() {
    let table = synthetic_cohort(7);
    let results = StatisticalFieldDetector::new().detect_field_types(&table);

    let names: Vec<&str> = results.iter().map(|r| r.field_name.as_str()).collect();
    assert_eq!(names, vec!["s_01", "d_1"]);

    let vital = &results[1];
    assert_eq!(vital.predicted_type, SemanticType::VitalStatus);
    assert!((vital.confidence - 0.7).abs() < 1e-9);
    assert!(vital.evidence.distribution[1] < 0.1);
    assert!(results[0].confidence >= results[1].confidence);
}

#[test]
fn test_unrelated_binary_column_is_not_reported() {
    let table = synthetic_cohort(3);
    let detector = StatisticalFieldDetector::with_config(DetectorConfig::default().with_min_confidence(0.0));

    assert!(detector.identify_ambiguous(&table).contains(&"x_7".to_string()));
    let results = detector.detect_field_types(&table);
    assert!(results.iter().all(|r| r.field_name != "x_7"));
}

#[test]
fn test_named_columns_are_anchors_not_ambiguous() {
    let table = synthetic_cohort(1);
    let detector = StatisticalFieldDetector::new();

    let ambiguous = detector.identify_ambiguous(&table);
    assert_eq!(ambiguous, vec!["s_01", "d_1", "x_7"]);
    assert_eq!(detector.identify_anchors(&table).len(), 5);
}

#[test]
fn test_results_serialize() {
    let table = synthetic_cohort(42);
    let results = StatisticalFieldDetector::new().detect_field_types(&table);
    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(json[0]["predicted_type"], "sex");
}
