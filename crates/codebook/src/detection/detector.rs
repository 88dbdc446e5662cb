//! Semantic-type detection for cryptically named binary columns.
//!
//! Anchor columns whose meaning is clear from their name (height, age,
//! hemoglobin...) serve as ground truth. Each ambiguous binary column is
//! split into its two groups and compared against the anchors; the pattern
//! of group differences suggests what the column encodes.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::stats::{mean, pearson, welch_t_test};
use crate::input::DataTable;
use crate::normalize::{distinct_values, parse_number};

// =============================================================================
// TYPES
// =============================================================================

/// Semantic label the detector can assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Sex,
    VitalStatus,
    TreatmentGroup,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Sex => "sex",
            SemanticType::VitalStatus => "vital_status",
            SemanticType::TreatmentGroup => "treatment_group",
        }
    }

    /// Confidence a battery must reach for its label to be reported.
    ///
    /// The treatment battery tops out at 0.3, so it never clears its own
    /// threshold until outcome evidence is added.
    pub fn threshold(&self) -> f64 {
        match self {
            SemanticType::Sex => 0.7,
            SemanticType::VitalStatus => 0.6,
            SemanticType::TreatmentGroup => 0.5,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known column meanings recognized from names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    Height,
    Weight,
    Age,
    Sex,
    Hemoglobin,
    Glucose,
    Creatinine,
    PatientId,
    SiteId,
}

impl AnchorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorKind::Height => "height",
            AnchorKind::Weight => "weight",
            AnchorKind::Age => "age",
            AnchorKind::Sex => "sex",
            AnchorKind::Hemoglobin => "hemoglobin",
            AnchorKind::Glucose => "glucose",
            AnchorKind::Creatinine => "creatinine",
            AnchorKind::PatientId => "patient_id",
            AnchorKind::SiteId => "site_id",
        }
    }
}

/// Name patterns per anchor kind; the first matching kind wins.
const ANCHOR_PATTERNS: &[(AnchorKind, &[&str])] = &[
    (AnchorKind::Height, &["height", "ht", "tall"]),
    (AnchorKind::Weight, &["weight", "wt", "mass"]),
    (AnchorKind::Age, &["age", "years"]),
    (AnchorKind::Sex, &["sex", "gender", "male", "female"]),
    (AnchorKind::Hemoglobin, &["hemoglobin", "hgb", "hb"]),
    (AnchorKind::Glucose, &["glucose", "gluc", "sugar"]),
    (AnchorKind::Creatinine, &["creatinine", "creat", "scr"]),
    (AnchorKind::PatientId, &["patient", "subject", "usubjid", "patid"]),
    (AnchorKind::SiteId, &["site", "center", "location"]),
];

/// Terms that make a column name self-explanatory.
const OBVIOUS_TERMS: &[&str] = &[
    "patient", "subject", "site", "date", "age", "height", "weight", "sex", "gender", "name", "id", "visit",
    "hemoglobin", "glucose",
];

/// Names this short or shorter are considered cryptic.
const SHORT_NAME: usize = 5;

/// Patterns up to this length only match whole name tokens.
const TOKEN_PATTERN_LEN: usize = 3;

/// Outcome of comparing an anchor across the two groups of a binary column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTest {
    pub t_statistic: f64,
    pub p_value: f64,
    /// Anchor mean per group, in coded (sorted) group order.
    pub group_means: [f64; 2],
    pub group_sizes: [usize; 2],
    pub significant: bool,
    /// Pearson r between the 0/1 group coding and the anchor.
    pub correlation: f64,
    /// Absolute difference of the group means.
    pub group_difference: f64,
}

impl GroupTest {
    /// Non-significant, zero-correlation result for inputs the tests cannot handle.
    pub fn degenerate() -> Self {
        Self {
            t_statistic: 0.0,
            p_value: 1.0,
            group_means: [0.0, 0.0],
            group_sizes: [0, 0],
            significant: false,
            correlation: 0.0,
            group_difference: 0.0,
        }
    }
}

/// Distribution facts about the analysed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvidence {
    /// Distinct values in coded order.
    pub unique_values: Vec<String>,
    /// Proportion of each value, aligned with `unique_values`.
    pub distribution: Vec<f64>,
    /// Non-missing values in the column.
    pub sample_size: usize,
}

/// A semantic label proposed for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDetectionResult {
    pub field_name: String,
    pub predicted_type: SemanticType,
    pub confidence: f64,
    pub evidence: DetectionEvidence,
    /// Anchor kind → correlation.
    pub correlations: IndexMap<String, f64>,
    /// Anchor kind → group comparison.
    pub statistical_tests: IndexMap<String, GroupTest>,
}

/// Detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Results below this confidence are not reported.
    pub min_confidence: f64,
    /// Minimum non-missing values (and joined rows) for any analysis.
    pub min_samples: usize,
    /// p-value below which a group difference is significant.
    pub significance: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            min_samples: 10,
            significance: 0.05,
        }
    }
}

impl DetectorConfig {
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }
}

/// Confidence and supporting tests from one hypothesis battery.
#[derive(Debug, Default)]
struct Battery {
    confidence: f64,
    correlations: IndexMap<String, f64>,
    tests: IndexMap<String, GroupTest>,
}

impl Battery {
    fn record(&mut self, kind: AnchorKind, test: &GroupTest) {
        self.correlations.insert(kind.as_str().to_string(), test.correlation);
        self.tests.insert(kind.as_str().to_string(), test.clone());
    }
}

/// A binary column reduced to its 0/1 coding.
struct BinaryColumn {
    /// The two distinct values, sorted (numerically when both are numbers).
    levels: [String; 2],
    /// Per row: `Some(0 | 1)` or `None` when missing.
    codes: Vec<Option<usize>>,
    /// Proportion of each level.
    proportions: [f64; 2],
    sample_size: usize,
}

impl BinaryColumn {
    fn from_values(values: &[&str]) -> Option<Self> {
        let distinct = distinct_values(values);
        if distinct.len() != 2 {
            return None;
        }

        let mut levels: Vec<&str> = distinct.into_iter().collect();
        levels.sort_by(|a, b| match (parse_number(a), parse_number(b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => a.cmp(b),
        });

        let codes: Vec<Option<usize>> = values
            .iter()
            .map(|v| {
                if DataTable::is_null_value(v) {
                    None
                } else {
                    levels.iter().position(|level| *level == v.trim())
                }
            })
            .collect();

        let mut counts = [0usize; 2];
        for code in codes.iter().flatten() {
            counts[*code] += 1;
        }
        let sample_size = counts[0] + counts[1];
        let proportions = [
            counts[0] as f64 / sample_size as f64,
            counts[1] as f64 / sample_size as f64,
        ];

        Some(Self {
            levels: [levels[0].to_string(), levels[1].to_string()],
            codes,
            proportions,
            sample_size,
        })
    }

    /// Smaller over larger group proportion.
    fn balance(&self) -> f64 {
        let (lo, hi) = if self.proportions[0] <= self.proportions[1] {
            (self.proportions[0], self.proportions[1])
        } else {
            (self.proportions[1], self.proportions[0])
        };
        if hi == 0.0 { 0.0 } else { lo / hi }
    }

    fn max_proportion(&self) -> f64 {
        self.proportions[0].max(self.proportions[1])
    }
}

// =============================================================================
// NAME HEURISTICS
// =============================================================================

/// Lowercase alphanumeric tokens of a column name.
fn name_tokens(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Short patterns match whole tokens (so `ht` does not fire inside
/// `weight`); longer ones match anywhere in the name.
fn name_matches(lowered: &str, tokens: &[String], pattern: &str) -> bool {
    if pattern.len() <= TOKEN_PATTERN_LEN {
        tokens.iter().any(|t| t == pattern)
    } else {
        lowered.contains(pattern)
    }
}

/// Anchor kind suggested by a column name.
pub fn anchor_kind(name: &str) -> Option<AnchorKind> {
    let lowered = name.to_lowercase();
    let tokens = name_tokens(name);
    ANCHOR_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| name_matches(&lowered, &tokens, p)))
        .map(|(kind, _)| *kind)
}

/// Whether a column name gives no reliable clue to its meaning.
pub fn is_ambiguous_name(name: &str) -> bool {
    let lowered = name.to_lowercase();
    let tokens = name_tokens(name);
    if OBVIOUS_TERMS.iter().any(|term| name_matches(&lowered, &tokens, term)) {
        return false;
    }

    let short = name.chars().count() <= SHORT_NAME;
    let numeric = !name.is_empty() && name.chars().all(char::is_numeric);
    let underscored = name.matches('_').count() > name.matches(' ').count();
    let upper = name.chars().any(char::is_alphabetic)
        && name.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase);
    let special = name
        .chars()
        .any(|c| !c.is_alphanumeric() && c != '_' && c != '-');

    short || numeric || underscored || upper || special
}

// =============================================================================
// DETECTOR
// =============================================================================

/// Detects the semantic type of ambiguous binary columns.
pub struct StatisticalFieldDetector {
    config: DetectorConfig,
}

impl StatisticalFieldDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Reported detections: results at or above the configured minimum
    /// confidence, highest confidence first, then dataset order.
    pub fn detect_field_types(&self, table: &DataTable) -> Vec<FieldDetectionResult> {
        let mut results: Vec<_> = self
            .analyze_dataset(table)
            .into_iter()
            .filter(|r| r.confidence >= self.config.min_confidence)
            .collect();
        results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        info!(detected = results.len(), "field type detection complete");
        results
    }

    /// Every result a battery produced, before the global confidence filter.
    pub fn analyze_dataset(&self, table: &DataTable) -> Vec<FieldDetectionResult> {
        let anchors = self.identify_anchors(table);
        let ambiguous = self.identify_ambiguous(table);
        info!(
            anchors = anchors.len(),
            ambiguous = ambiguous.len(),
            "identified anchor and ambiguous columns"
        );

        ambiguous
            .iter()
            .filter_map(|column| self.analyze_field(table, column, &anchors))
            .collect()
    }

    /// Anchor kind → first column (in dataset order) of that kind.
    pub fn identify_anchors(&self, table: &DataTable) -> IndexMap<AnchorKind, usize> {
        let mut anchors = IndexMap::new();
        for (index, header) in table.headers.iter().enumerate() {
            if let Some(kind) = anchor_kind(header) {
                anchors.entry(kind).or_insert(index);
            }
        }
        anchors
    }

    /// Columns whose names need statistical detection.
    pub fn identify_ambiguous(&self, table: &DataTable) -> Vec<String> {
        table
            .headers
            .iter()
            .filter(|h| is_ambiguous_name(h))
            .cloned()
            .collect()
    }

    /// Run the hypothesis batteries on one column.
    ///
    /// Only binary columns with enough values are analysed; multi-valued
    /// columns yield nothing.
    pub fn analyze_field(
        &self,
        table: &DataTable,
        column: &str,
        anchors: &IndexMap<AnchorKind, usize>,
    ) -> Option<FieldDetectionResult> {
        let values = table.column_by_name(column)?;
        let present = values.iter().filter(|v| !DataTable::is_null_value(v)).count();
        if present < self.config.min_samples {
            debug!(column, present, "too few values for detection");
            return None;
        }

        let Some(binary) = BinaryColumn::from_values(&values) else {
            debug!(column, "not binary, skipping");
            return None;
        };

        let batteries = [
            (SemanticType::Sex, self.sex_battery(table, &binary, anchors)),
            (SemanticType::VitalStatus, self.vital_status_battery(table, &binary, anchors)),
            (SemanticType::TreatmentGroup, self.treatment_battery(&binary)),
        ];

        let mut best: Option<(SemanticType, Battery)> = None;
        for (label, battery) in batteries {
            debug!(column, label = %label, confidence = battery.confidence, "battery result");
            if battery.confidence < label.threshold() {
                continue;
            }
            // Strictly greater keeps the earlier label on ties.
            if best.as_ref().is_none_or(|(_, b)| battery.confidence > b.confidence) {
                best = Some((label, battery));
            }
        }

        let (predicted_type, battery) = best?;
        Some(FieldDetectionResult {
            field_name: column.to_string(),
            predicted_type,
            confidence: battery.confidence,
            evidence: DetectionEvidence {
                unique_values: binary.levels.to_vec(),
                distribution: binary.proportions.to_vec(),
                sample_size: binary.sample_size,
            },
            correlations: battery.correlations,
            statistical_tests: battery.tests,
        })
    }

    /// Balanced split plus taller, heavier, higher-hemoglobin group.
    fn sex_battery(&self, table: &DataTable, binary: &BinaryColumn, anchors: &IndexMap<AnchorKind, usize>) -> Battery {
        let mut battery = Battery::default();
        if binary.balance() < 0.3 {
            return battery;
        }
        battery.confidence += 0.2;

        // (anchor, min correlation, min mean gap, award)
        let checks = [
            (AnchorKind::Height, 0.3, 5.0, 0.3),
            (AnchorKind::Weight, 0.2, 8.0, 0.2),
            (AnchorKind::Hemoglobin, 0.3, 1.0, 0.3),
        ];
        for (kind, min_r, min_gap, award) in checks {
            let Some(&anchor) = anchors.get(&kind) else {
                continue;
            };
            let test = self.group_test(table, binary, anchor);
            if test.significant && test.correlation > min_r && test.group_difference > min_gap {
                battery.confidence += award;
            }
            battery.record(kind, &test);
        }

        battery.confidence = battery.confidence.min(1.0);
        battery
    }

    /// Lopsided split plus an association with age.
    fn vital_status_battery(
        &self,
        table: &DataTable,
        binary: &BinaryColumn,
        anchors: &IndexMap<AnchorKind, usize>,
    ) -> Battery {
        let mut battery = Battery::default();
        if binary.max_proportion() > 0.9 {
            battery.confidence += 0.3;
        }

        if let Some(&anchor) = anchors.get(&AnchorKind::Age) {
            let test = self.group_test(table, binary, anchor);
            if test.significant && test.correlation.abs() > 0.2 {
                battery.confidence += 0.4;
            }
            battery.record(AnchorKind::Age, &test);
        }

        battery.confidence = battery.confidence.min(1.0);
        battery
    }

    /// Near-even split, as randomization produces.
    fn treatment_battery(&self, binary: &BinaryColumn) -> Battery {
        let mut battery = Battery::default();
        if binary.balance() > 0.4 {
            battery.confidence += 0.3;
        }
        battery
    }

    /// Compare the anchor between the two groups of a binary column.
    fn group_test(&self, table: &DataTable, binary: &BinaryColumn, anchor: usize) -> GroupTest {
        let mut groups: [Vec<f64>; 2] = [Vec::new(), Vec::new()];
        let mut coded = Vec::new();
        let mut measured = Vec::new();

        for (code, value) in binary.codes.iter().zip(table.column_values(anchor)) {
            let (Some(code), Some(value)) = (code, parse_number(value)) else {
                continue;
            };
            groups[*code].push(value);
            coded.push(*code as f64);
            measured.push(value);
        }

        if coded.len() < self.config.min_samples || groups.iter().any(|g| g.len() < 2) {
            return GroupTest::degenerate();
        }
        let (Some(welch), Some(correlation)) = (welch_t_test(&groups[0], &groups[1]), pearson(&coded, &measured))
        else {
            return GroupTest::degenerate();
        };

        let group_means = [mean(&groups[0]), mean(&groups[1])];
        GroupTest {
            t_statistic: welch.t_statistic,
            p_value: welch.p_value,
            group_means,
            group_sizes: [groups[0].len(), groups[1].len()],
            significant: welch.p_value < self.config.significance,
            correlation,
            group_difference: (group_means[1] - group_means[0]).abs(),
        }
    }
}

impl Default for StatisticalFieldDetector {
    fn default() -> Self {
        Self::new()
    }
}
