//! Normalize command - normalize a dataset and write a quality report.

use std::path::{Path, PathBuf};

use codebook::normalize::NormalizerConfig;
use codebook::{Codebook, CodebookConfig, Severity};
use colored::Colorize;

/// `<dir>/<stem>.<suffix>` next to the dataset.
fn sibling(dataset: &Path, suffix: &str) -> PathBuf {
    let mut p = dataset.to_path_buf();
    let stem = p.file_stem().unwrap_or_default().to_string_lossy().into_owned();
    p.set_file_name(format!("{}.{}", stem, suffix));
    p
}

pub fn run(
    dictionary: PathBuf,
    dataset: PathBuf,
    output: Option<PathBuf>,
    report_path: Option<PathBuf>,
    reference_year: Option<i32>,
) -> Result<(), Box<dyn std::error::Error>> {
    for path in [&dictionary, &dataset] {
        if !path.exists() {
            return Err(format!("File not found: {}", path.display()).into());
        }
    }

    let mut normalizer = NormalizerConfig::default();
    if let Some(year) = reference_year {
        normalizer = normalizer.with_reference_year(year);
    }
    let codebook = Codebook::with_config(CodebookConfig::default().with_normalizer(normalizer));

    println!(
        "{} {} {} {}",
        "Normalizing".cyan().bold(),
        dataset.display().to_string().white(),
        "against".cyan(),
        dictionary.display().to_string().white()
    );

    let result = codebook.analyze(&dictionary, &dataset)?;

    let output_path = output.unwrap_or_else(|| sibling(&dataset, "normalized.csv"));
    let report_path = report_path.unwrap_or_else(|| sibling(&dataset, "quality.json"));
    result.normalized.table.write_csv(&output_path)?;
    result.report.save(&report_path)?;

    let report = &result.report;
    println!(
        "Found {} issues ({} critical, {} errors, {} warnings)",
        report.issues.len().to_string().white().bold(),
        report.count(Severity::Critical).to_string().magenta(),
        report.count(Severity::Error).to_string().red(),
        report.count(Severity::Warning).to_string().yellow()
    );
    println!();
    println!("  Completeness: {:.0}%", report.completeness_score * 100.0);
    println!("  Consistency:  {:.0}%", report.consistency_score * 100.0);
    println!("  Validity:     {:.0}%", report.validity_score * 100.0);

    let score = report.overall_score * 100.0;
    let score_text = format!("{:.0}%", score);
    let score_color = if score >= 80.0 {
        score_text.green()
    } else if score >= 50.0 {
        score_text.yellow()
    } else {
        score_text.red()
    };
    println!("  Overall:      {}", score_color.bold());
    println!();

    if !result.detections.is_empty() {
        println!("{}", "Detected columns:".yellow().bold());
        for detection in &result.detections {
            println!(
                "  {:16} {} ({:.2})",
                detection.field_name, detection.predicted_type, detection.confidence
            );
        }
        println!();
    }

    println!("{}", result.summary.recommendation);
    println!();
    println!(
        "{} {}",
        "Saved data to".green().bold(),
        output_path.display().to_string().white()
    );
    println!(
        "{} {}",
        "Saved report to".green().bold(),
        report_path.display().to_string().white()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_paths() {
        let path = sibling(Path::new("/data/visits.csv"), "quality.json");
        assert_eq!(path, PathBuf::from("/data/visits.quality.json"));
    }

    #[test]
    fn test_run_writes_outputs_beside_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let dictionary = dir.path().join("dictionary.csv");
        let dataset = dir.path().join("visits.csv");
        std::fs::write(&dictionary, "field_name,field_type,required\nage,integer,yes\nvisit,date,no\n").unwrap();
        std::fs::write(&dataset, "age,visit\n34,03/01/2024\n,2024-03-15\n").unwrap();

        run(dictionary, dataset, None, None, None).unwrap();

        let normalized = std::fs::read_to_string(dir.path().join("visits.normalized.csv")).unwrap();
        assert_eq!(normalized, "age,visit\n34,2024-03-01\n,2024-03-15\n");

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("visits.quality.json")).unwrap()).unwrap();
        assert_eq!(report["total_records"], 2);
        assert_eq!(report["issues"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_run_rejects_missing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let dictionary = dir.path().join("dictionary.csv");
        std::fs::write(&dictionary, "field_name,field_type\nage,integer\n").unwrap();

        let err = run(dictionary, dir.path().join("absent.csv"), None, None, None).unwrap_err();
        assert!(err.to_string().starts_with("File not found"));
    }
}
