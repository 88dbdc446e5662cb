//! Detect command - label ambiguous binary columns.

use std::path::PathBuf;

use codebook::detection::DetectorConfig;
use codebook::{Codebook, CodebookConfig};
use colored::Colorize;

pub fn run(dataset: PathBuf, min_confidence: f64, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !dataset.exists() {
        return Err(format!("File not found: {}", dataset.display()).into());
    }
    if !(0.0..=1.0).contains(&min_confidence) {
        return Err(format!("--min-confidence must be between 0 and 1, got {}", min_confidence).into());
    }

    let detector = DetectorConfig::default().with_min_confidence(min_confidence);
    let codebook = Codebook::with_config(CodebookConfig::default().with_detector(detector));

    let (table, _source) = codebook.read_dataset(&dataset)?;
    let results = codebook.detect(&table);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!(
        "{} {} ({} rows, {} columns)",
        "Detecting".cyan().bold(),
        dataset.display().to_string().white(),
        table.row_count(),
        table.column_count()
    );
    println!();

    if results.is_empty() {
        println!("{}", "No ambiguous fields detected with sufficient confidence.".yellow());
        return Ok(());
    }

    for result in &results {
        println!(
            "  {:16} {:16} {:.2}",
            result.field_name.white().bold(),
            result.predicted_type.to_string().green(),
            result.confidence
        );
        let values: Vec<String> = result
            .evidence
            .unique_values
            .iter()
            .zip(&result.evidence.distribution)
            .map(|(value, share)| format!("{} {:.0}%", value, share * 100.0))
            .collect();
        println!("    values: {}  (n = {})", values.join(", "), result.evidence.sample_size);
        for (anchor, test) in &result.statistical_tests {
            println!(
                "    {:12} r = {:+.2}  p = {:.4}  diff = {:.2}",
                anchor, test.correlation, test.p_value, test.group_difference
            );
        }
    }

    Ok(())
}
