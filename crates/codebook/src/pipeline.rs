//! Main Codebook struct and public API.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clinical::{ClinicalFormatIntegrator, ParseOutcome};
use crate::detection::{DetectorConfig, FieldDetectionResult, StatisticalFieldDetector};
use crate::error::Result;
use crate::input::{DataTable, DatasetReader, ReaderConfig, SourceMetadata};
use crate::mapping::{ArchetypeMapping, CanonicalFieldMapper};
use crate::normalize::{
    DataNormalizer, DataQualityReport, NormalizedDataset, NormalizerConfig, QualityScorer, Severity,
};
use crate::parse::ParserConfig;
use crate::schema::DataDictionary;

/// Configuration for a Codebook run.
#[derive(Debug, Clone, Default)]
pub struct CodebookConfig {
    /// Dictionary parser configuration.
    pub parser: ParserConfig,
    /// Dataset reader configuration.
    pub reader: ReaderConfig,
    /// Normalization configuration.
    pub normalizer: NormalizerConfig,
    /// Field detection configuration.
    pub detector: DetectorConfig,
}

impl CodebookConfig {
    pub fn with_parser(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_normalizer(mut self, normalizer: NormalizerConfig) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }
}

/// A parsed dictionary together with its archetype mapping.
#[derive(Debug, Clone)]
pub struct DictionaryInspection {
    pub outcome: ParseOutcome,
    pub mapping: ArchetypeMapping,
}

/// Result of running the full pipeline on a dictionary and a dataset.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Metadata about the dataset file.
    pub source: SourceMetadata,
    /// Parsed dictionary.
    pub dictionary: DataDictionary,
    /// Archetype → candidate fields.
    pub mapping: ArchetypeMapping,
    /// Normalized dataset and its issues.
    pub normalized: NormalizedDataset,
    /// Quality assessment of the normalized dataset.
    pub report: DataQualityReport,
    /// Semantic labels proposed for ambiguous columns.
    pub detections: Vec<FieldDetectionResult>,
    /// Summary statistics.
    pub summary: AnalysisSummary,
}

/// Summary of the analysis results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Fields in the dictionary.
    pub total_fields: usize,
    /// Archetypes with at least one candidate field.
    pub mapped_archetypes: usize,
    /// Columns with at least one issue.
    pub fields_with_issues: usize,
    pub total_issues: usize,
    pub issues_by_severity: IssueCounts,
    /// Overall quality score (0.0-1.0).
    pub quality_score: f64,
    /// Columns given a semantic label by the detector.
    pub detected_fields: usize,
    /// Human-readable recommendation.
    pub recommendation: String,
}

/// Counts of issues by severity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueCounts {
    pub critical: usize,
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

/// The main Codebook engine.
pub struct Codebook {
    config: CodebookConfig,
    integrator: ClinicalFormatIntegrator,
    reader: DatasetReader,
    mapper: CanonicalFieldMapper,
    normalizer: DataNormalizer,
    scorer: QualityScorer,
    detector: StatisticalFieldDetector,
}

impl Codebook {
    /// Create a new Codebook instance with default configuration.
    pub fn new() -> Self {
        Self::with_config(CodebookConfig::default())
    }

    /// Create a Codebook instance with custom configuration.
    pub fn with_config(config: CodebookConfig) -> Self {
        Self {
            integrator: ClinicalFormatIntegrator::with_config(config.parser.clone()),
            reader: DatasetReader::with_config(config.reader.clone()),
            mapper: CanonicalFieldMapper::new(),
            normalizer: DataNormalizer::with_config(config.normalizer.clone()),
            scorer: QualityScorer::new(),
            detector: StatisticalFieldDetector::with_config(config.detector.clone()),
            config,
        }
    }

    pub fn config(&self) -> &CodebookConfig {
        &self.config
    }

    /// Parse a dictionary file and map its fields onto the archetypes.
    pub fn inspect(&self, dictionary: impl AsRef<Path>) -> Result<DictionaryInspection> {
        let outcome = self.integrator.parse_file(dictionary)?;
        let mapping = self.mapper.map_fields(&outcome.dictionary);
        Ok(DictionaryInspection { outcome, mapping })
    }

    /// Read a delimited dataset file.
    pub fn read_dataset(&self, dataset: impl AsRef<Path>) -> Result<(DataTable, SourceMetadata)> {
        self.reader.read_file(dataset)
    }

    /// Normalize a dataset against a dictionary and score the result.
    pub fn normalize(&self, table: &DataTable, dictionary: &DataDictionary) -> (NormalizedDataset, DataQualityReport) {
        let normalized = self.normalizer.normalize_dataset(table, dictionary);
        let report = self.scorer.score(&normalized);
        (normalized, report)
    }

    /// Propose semantic labels for ambiguous columns of a raw dataset.
    pub fn detect(&self, table: &DataTable) -> Vec<FieldDetectionResult> {
        self.detector.detect_field_types(table)
    }

    /// Run the whole pipeline on a dictionary and a dataset.
    pub fn analyze(&self, dictionary: impl AsRef<Path>, dataset: impl AsRef<Path>) -> Result<AnalysisResult> {
        let DictionaryInspection { outcome, mapping } = self.inspect(dictionary)?;
        let (table, source) = self.read_dataset(dataset)?;

        let (normalized, report) = self.normalize(&table, &outcome.dictionary);
        // Detection runs on the raw cells; normalization may recode them.
        let detections = self.detect(&table);

        let summary = self.compute_summary(&outcome.dictionary, &mapping, &report, &detections);
        info!(
            fields = summary.total_fields,
            issues = summary.total_issues,
            score = summary.quality_score,
            "analysis complete"
        );

        Ok(AnalysisResult {
            source,
            dictionary: outcome.dictionary,
            mapping,
            normalized,
            report,
            detections,
            summary,
        })
    }

    /// Compute summary statistics from analysis results.
    fn compute_summary(
        &self,
        dictionary: &DataDictionary,
        mapping: &ArchetypeMapping,
        report: &DataQualityReport,
        detections: &[FieldDetectionResult],
    ) -> AnalysisSummary {
        let fields_with_issues = report.issues.iter().map(|i| i.field.as_str()).collect::<HashSet<_>>().len();

        let mut issues_by_severity = IssueCounts::default();
        for issue in &report.issues {
            match issue.severity {
                Severity::Critical => issues_by_severity.critical += 1,
                Severity::Error => issues_by_severity.error += 1,
                Severity::Warning => issues_by_severity.warning += 1,
                Severity::Info => issues_by_severity.info += 1,
            }
        }

        let recommendation = Self::recommendation(&issues_by_severity, report.overall_score);

        AnalysisSummary {
            total_fields: dictionary.len(),
            mapped_archetypes: mapping.values().filter(|c| !c.is_empty()).count(),
            fields_with_issues,
            total_issues: report.issues.len(),
            issues_by_severity,
            quality_score: report.overall_score,
            detected_fields: detections.len(),
            recommendation,
        }
    }

    /// Generate a recommendation based on the analysis.
    fn recommendation(counts: &IssueCounts, quality_score: f64) -> String {
        if counts.critical > 0 {
            format!(
                "{} required fields are absent from the dataset. Check the dictionary matches the data.",
                counts.critical
            )
        } else if counts.error > 0 {
            format!("Address {} error-level issues before proceeding with analysis.", counts.error)
        } else if counts.warning > 5 {
            format!(
                "Review {} warning-level issues to improve data quality (score: {:.0}%).",
                counts.warning,
                quality_score * 100.0
            )
        } else if quality_score >= 0.9 {
            "Data quality is good. Minor issues detected for review.".to_string()
        } else if quality_score >= 0.7 {
            "Data quality is acceptable. Consider addressing warnings.".to_string()
        } else {
            "Data quality needs attention. Review all issues.".to_string()
        }
    }
}

impl Default for Codebook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const DICTIONARY: &str = "\
field_name,field_type,label,required,min_value,max_value,choices
patient_id,identifier,Patient ID,yes,,,
age,integer,Age at enrollment,yes,0,120,
sex,binary,Sex,no,,,\"1, Male | 2, Female\"
visit_date,date,Visit date,no,,,
";

    #[test]
    fn test_inspect_dictionary() {
        let dictionary = create_test_file(".csv", DICTIONARY);
        let inspection = Codebook::new().inspect(dictionary.path()).unwrap();

        assert_eq!(inspection.outcome.dictionary.len(), 4);
        assert_eq!(inspection.outcome.parser, "csv");
        assert_eq!(inspection.mapping["age"][0].field_name, "age");
        assert_eq!(inspection.mapping["patient_id"][0].field_name, "patient_id");
    }

    #[test]
    fn test_analyze_end_to_end() {
        let dictionary = create_test_file(".csv", DICTIONARY);
        let dataset = create_test_file(
            ".csv",
            "patient_id,age,sex,visit_date\nP1,34,1,2023-01-05\nP2,130,2,2023/02/10\nP3,,male,not a date\n",
        );

        let result = Codebook::new().analyze(dictionary.path(), dataset.path()).unwrap();

        assert_eq!(result.source.row_count, 3);
        assert_eq!(result.report.total_records, 3);
        assert_eq!(result.summary.total_fields, 4);
        // Missing required age, age above maximum, unparseable date.
        assert_eq!(result.summary.issues_by_severity.error, 1);
        assert_eq!(result.summary.issues_by_severity.warning, 2);
        assert!(result.summary.recommendation.starts_with("Address 1 error-level"));

        let sex = result.normalized.table.column_by_name("sex").unwrap();
        assert_eq!(sex, vec!["Male", "Female", "Male"]);
        let dates = result.normalized.table.column_by_name("visit_date").unwrap();
        assert_eq!(dates, vec!["2023-01-05", "2023-02-10", "not a date"]);
    }

    #[test]
    fn test_recommendation_levels() {
        let clean = IssueCounts::default();
        assert!(Codebook::recommendation(&clean, 0.95).starts_with("Data quality is good"));
        assert!(Codebook::recommendation(&clean, 0.75).starts_with("Data quality is acceptable"));
        assert!(Codebook::recommendation(&clean, 0.5).starts_with("Data quality needs attention"));

        let critical = IssueCounts { critical: 2, ..IssueCounts::default() };
        assert!(Codebook::recommendation(&critical, 1.0).starts_with("2 required fields"));
    }
}
