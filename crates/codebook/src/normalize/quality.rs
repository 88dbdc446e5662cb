//! Dataset quality scoring and per-field statistics.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::infer::{infer_type, parse_number};
use super::issue::{Severity, ValidationIssue};
use super::normalizer::NormalizedDataset;
use crate::error::Result;
use crate::input::DataTable;
use crate::schema::{write_json, FieldType};

/// Consistency score when the observed type equals the declared type.
const EXACT_TYPE: f64 = 1.0;
/// Observed type is in the declared type's compatible group.
const COMPATIBLE_TYPE: f64 = 0.7;
const MISMATCHED_TYPE: f64 = 0.3;
/// Consistency when no column qualifies.
const DEFAULT_CONSISTENCY: f64 = 0.5;

// =============================================================================
// REPORT TYPES
// =============================================================================

/// Summary statistics for numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub mean: f64,
    /// Sample standard deviation (n − 1); zero for a single value.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

/// Value frequencies for coded columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalSummary {
    /// Value → count, most frequent first.
    pub value_distribution: IndexMap<String, usize>,
    pub most_common: Option<String>,
}

/// Length statistics for text columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSummary {
    pub avg_length: f64,
    pub min_length: usize,
    pub max_length: usize,
}

/// Statistics for one normalized column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStatistics {
    pub total_count: usize,
    pub missing_count: usize,
    /// Distinct non-missing values.
    pub unique_count: usize,
    pub completeness: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub numeric: Option<NumericSummary>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub categorical: Option<CategoricalSummary>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<TextSummary>,
}

/// Quality assessment of a normalized dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub total_records: usize,
    pub total_fields: usize,
    pub completeness_score: f64,
    pub consistency_score: f64,
    pub validity_score: f64,
    /// Mean of the three component scores.
    pub overall_score: f64,
    pub issues: Vec<ValidationIssue>,
    pub field_stats: IndexMap<String, FieldStatistics>,
}

impl DataQualityReport {
    /// Number of issues at the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Issues reported for one column.
    pub fn issues_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationIssue> {
        self.issues.iter().filter(move |i| i.field == field)
    }

    /// Write the report as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path.as_ref(), self)
    }
}

// =============================================================================
// STREAMING STATISTICS
// =============================================================================
// Welford's online algorithm for mean and variance in a single pass.

#[derive(Debug, Default)]
struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        }
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Sample variance.
    fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        0.0
    } else if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

// =============================================================================
// SCORER
// =============================================================================

/// Computes completeness, consistency, validity and per-field statistics.
pub struct QualityScorer;

impl QualityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score a normalized dataset.
    pub fn score(&self, dataset: &NormalizedDataset) -> DataQualityReport {
        let table = &dataset.table;
        let completeness_score = Self::completeness(table);
        let consistency_score = self.consistency(dataset);
        let validity_score = Self::validity(&dataset.issues);
        let overall_score = (completeness_score + consistency_score + validity_score) / 3.0;

        let field_stats = table
            .headers
            .iter()
            .enumerate()
            .map(|(index, header)| {
                let values: Vec<&str> = table.column_values(index).collect();
                let field_type = dataset
                    .column_types
                    .get(header)
                    .map(|t| t.field_type())
                    .unwrap_or_else(|| infer_type(&values));
                (header.clone(), self.field_statistics(&values, field_type))
            })
            .collect();

        info!(
            completeness = completeness_score,
            consistency = consistency_score,
            validity = validity_score,
            overall = overall_score,
            "quality scored"
        );

        DataQualityReport {
            total_records: table.row_count(),
            total_fields: table.column_count(),
            completeness_score,
            consistency_score,
            validity_score,
            overall_score,
            issues: dataset.issues.clone(),
            field_stats,
        }
    }

    /// 1 − missing cells / total cells; 1.0 for an empty table.
    pub fn completeness(table: &DataTable) -> f64 {
        let total = table.row_count() * table.column_count();
        if total == 0 {
            return 1.0;
        }
        1.0 - table.missing_cells() as f64 / total as f64
    }

    /// Mean agreement between declared types and the types the normalized
    /// values look like.
    pub fn consistency(&self, dataset: &NormalizedDataset) -> f64 {
        let mut scores = Vec::new();

        for (index, header) in dataset.table.headers.iter().enumerate() {
            let Some(column_type) = dataset.column_types.get(header) else {
                continue;
            };
            let declared = column_type.field_type();
            if !column_type.is_declared() || declared == FieldType::Unknown {
                continue;
            }

            let values: Vec<&str> = dataset
                .table
                .column_values(index)
                .filter(|v| !DataTable::is_null_value(v))
                .collect();
            if values.is_empty() {
                continue;
            }

            let observed = infer_type(&values);
            scores.push(if observed == declared {
                EXACT_TYPE
            } else if declared.is_compatible_with(observed) {
                COMPATIBLE_TYPE
            } else {
                MISMATCHED_TYPE
            });
        }

        if scores.is_empty() {
            DEFAULT_CONSISTENCY
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }

    /// 1 − Σ weight / (count × critical weight); 1.0 with no issues.
    pub fn validity(issues: &[ValidationIssue]) -> f64 {
        if issues.is_empty() {
            return 1.0;
        }
        let penalty: f64 = issues.iter().map(|i| i.severity.weight()).sum();
        let max_penalty = issues.len() as f64 * Severity::Critical.weight();
        1.0 - penalty / max_penalty
    }

    /// Counts plus the summary matching the column's type family.
    pub fn field_statistics(&self, values: &[&str], field_type: FieldType) -> FieldStatistics {
        let present: Vec<&str> = values
            .iter()
            .copied()
            .filter(|v| !DataTable::is_null_value(v))
            .collect();

        let mut distribution: IndexMap<String, usize> = IndexMap::new();
        for value in &present {
            *distribution.entry(value.to_string()).or_insert(0) += 1;
        }

        let total_count = values.len();
        let missing_count = total_count - present.len();
        let completeness = if total_count == 0 {
            0.0
        } else {
            present.len() as f64 / total_count as f64
        };

        let mut stats = FieldStatistics {
            total_count,
            missing_count,
            unique_count: distribution.len(),
            completeness,
            numeric: None,
            categorical: None,
            text: None,
        };

        if field_type.is_numeric() {
            let mut numbers: Vec<f64> = present.iter().filter_map(|v| parse_number(v)).collect();
            if !numbers.is_empty() {
                let mut running = RunningStats::default();
                numbers.iter().for_each(|n| running.add(*n));
                numbers.sort_by(f64::total_cmp);
                stats.numeric = Some(NumericSummary {
                    mean: running.mean,
                    std: running.variance().sqrt(),
                    min: running.min,
                    max: running.max,
                    median: median(&numbers),
                });
            }
        } else if field_type.is_discrete() {
            // Stable sort keeps first-seen order among equal counts.
            distribution.sort_by(|_, a, _, b| b.cmp(a));
            let most_common = distribution.keys().next().cloned();
            stats.categorical = Some(CategoricalSummary {
                value_distribution: distribution,
                most_common,
            });
        } else if field_type.is_textual() && !present.is_empty() {
            let lengths: Vec<usize> = present.iter().map(|v| v.chars().count()).collect();
            stats.text = Some(TextSummary {
                avg_length: lengths.iter().sum::<usize>() as f64 / lengths.len() as f64,
                min_length: lengths.iter().copied().min().unwrap_or(0),
                max_length: lengths.iter().copied().max().unwrap_or(0),
            });
        }

        stats
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new()
    }
}
