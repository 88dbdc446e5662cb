//! Per-type normalization of dataset columns against a data dictionary.

use std::collections::HashSet;

use chrono::{Datelike, Utc};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::infer::{DATE_OUTPUT, DATETIME_OUTPUT, distinct_values, infer_type, parse_date, parse_datetime, parse_number};
use super::issue::{IssueCollector, Severity, ValidationIssue};
use crate::input::DataTable;
use crate::schema::{Choice, DataDictionary, FieldDescriptor, FieldType};

// =============================================================================
// LOOKUP TABLES
// =============================================================================

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.+-]+@[\w.-]+\.[A-Za-z]{2,}$").unwrap());

const SEX_VALUES: &[(&str, &str)] = &[
    ("1", "Male"),
    ("male", "Male"),
    ("m", "Male"),
    ("man", "Male"),
    ("2", "Female"),
    ("female", "Female"),
    ("f", "Female"),
    ("woman", "Female"),
    ("0", "Unknown"),
    ("unknown", "Unknown"),
    ("u", "Unknown"),
];

const VITAL_STATUS_VALUES: &[(&str, &str)] = &[
    ("0", "Alive"),
    ("alive", "Alive"),
    ("living", "Alive"),
    ("a", "Alive"),
    ("1", "Deceased"),
    ("deceased", "Deceased"),
    ("dead", "Deceased"),
    ("d", "Deceased"),
    ("unknown", "Unknown"),
    ("u", "Unknown"),
];

const YES_NO_VALUES: &[(&str, &str)] = &[
    ("1", "Yes"),
    ("yes", "Yes"),
    ("y", "Yes"),
    ("true", "Yes"),
    ("positive", "Yes"),
    ("0", "No"),
    ("no", "No"),
    ("n", "No"),
    ("false", "No"),
    ("negative", "No"),
    ("unknown", "Unknown"),
    ("u", "Unknown"),
];

const TRUE_VALUES: &[&str] = &["true", "1", "yes", "y", "on", "t"];
const FALSE_VALUES: &[&str] = &["false", "0", "no", "n", "off", "f"];

// =============================================================================
// CONFIGURATION & RESULTS
// =============================================================================

/// Normalizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Earliest plausible year for date values.
    pub min_year: i32,
    /// How many years past the reference year a date may lie.
    pub future_years: i32,
    /// Year the plausibility window is anchored on; the current year if unset.
    pub reference_year: Option<i32>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_year: 1900,
            future_years: 10,
            reference_year: None,
        }
    }
}

impl NormalizerConfig {
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    /// Latest plausible year for date values.
    pub fn max_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(|| Utc::now().year()) + self.future_years
    }
}

/// Where a column's effective type came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", content = "type", rename_all = "snake_case")]
pub enum ColumnType {
    /// Declared by a dictionary descriptor.
    Declared(FieldType),
    /// Inferred from the values of a column the dictionary does not describe.
    Inferred(FieldType),
}

impl ColumnType {
    pub fn field_type(&self) -> FieldType {
        match self {
            ColumnType::Declared(t) | ColumnType::Inferred(t) => *t,
        }
    }

    pub fn is_declared(&self) -> bool {
        matches!(self, ColumnType::Declared(_))
    }
}

/// Normalized dataset plus everything found along the way.
#[derive(Debug, Clone)]
pub struct NormalizedDataset {
    /// Same shape as the input, normalized cells.
    pub table: DataTable,
    /// Issues in column order, row order within a column.
    pub issues: Vec<ValidationIssue>,
    /// Effective type of every column.
    pub column_types: IndexMap<String, ColumnType>,
}

// =============================================================================
// TYPE NORMALIZERS
// =============================================================================

/// Normalizes one column of a single field type.
///
/// Missing cells are never passed to the conversion; they are copied through.
pub trait ValueNormalizer {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Normalize every cell, reporting problems to `issues`.
    fn normalize(&self, field: &FieldDescriptor, values: &[&str], issues: &mut IssueCollector) -> Vec<String>;
}

/// Apply `f` to present cells, copying missing cells verbatim.
fn map_present(values: &[&str], mut f: impl FnMut(usize, &str) -> String) -> Vec<String> {
    values
        .iter()
        .enumerate()
        .map(|(row, value)| {
            if DataTable::is_null_value(value) {
                value.to_string()
            } else {
                f(row, value)
            }
        })
        .collect()
}

/// Magnitude at which an `f64` no longer fits an `i64` (2^63).
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Integer and decimal columns.
pub struct NumericNormalizer {
    pub integer: bool,
}

impl ValueNormalizer for NumericNormalizer {
    fn name(&self) -> &'static str {
        if self.integer { "integer" } else { "decimal" }
    }

    fn normalize(&self, _field: &FieldDescriptor, values: &[&str], issues: &mut IssueCollector) -> Vec<String> {
        map_present(values, |row, raw| match parse_number(raw) {
            Some(n) if self.integer && n.round().abs() < I64_BOUND => format!("{}", n.round() as i64),
            Some(_) if self.integer => {
                let issue = issues
                    .issue(Severity::Warning, "Integer value out of range")
                    .with_value(raw)
                    .at_row(row)
                    .with_suggestion("Store very large identifiers as text");
                issues.push(issue);
                raw.to_string()
            }
            Some(n) => n.to_string(),
            None => {
                let (message, suggestion) = if self.integer {
                    ("Value could not be converted to integer", "Check for non-numeric characters")
                } else {
                    (
                        "Value could not be converted to number",
                        "Check for non-numeric characters or formatting",
                    )
                };
                let issue = issues
                    .issue(Severity::Warning, message)
                    .with_value(raw)
                    .at_row(row)
                    .with_suggestion(suggestion);
                issues.push(issue);
                raw.to_string()
            }
        })
    }
}

/// Date and date-time columns, with a plausible-year window.
pub struct TemporalNormalizer {
    pub with_time: bool,
    pub min_year: i32,
    pub max_year: i32,
}

impl ValueNormalizer for TemporalNormalizer {
    fn name(&self) -> &'static str {
        if self.with_time { "datetime" } else { "date" }
    }

    fn normalize(&self, _field: &FieldDescriptor, values: &[&str], issues: &mut IssueCollector) -> Vec<String> {
        map_present(values, |row, raw| {
            let parsed = if self.with_time {
                parse_datetime(raw).map(|dt| (dt.year(), dt.format(DATETIME_OUTPUT).to_string()))
            } else {
                parse_date(raw).map(|d| (d.year(), d.format(DATE_OUTPUT).to_string()))
            };

            let Some((year, rendered)) = parsed else {
                let issue = issues
                    .issue(Severity::Warning, "Value could not be parsed as date")
                    .with_value(raw)
                    .at_row(row)
                    .with_suggestion("Use format YYYY-MM-DD");
                issues.push(issue);
                return raw.to_string();
            };

            if year < self.min_year || year > self.max_year {
                let issue = issues
                    .issue(Severity::Warning, "Date seems unreasonable")
                    .with_value(raw)
                    .at_row(row)
                    .with_suggestion(format!(
                        "Check year is between {} and {}",
                        self.min_year, self.max_year
                    ));
                issues.push(issue);
            }
            rendered
        })
    }
}

/// Maps raw codes and labels onto the declared choice labels.
pub struct CategoricalNormalizer;

impl ValueNormalizer for CategoricalNormalizer {
    fn name(&self) -> &'static str {
        "categorical"
    }

    fn normalize(&self, field: &FieldDescriptor, values: &[&str], issues: &mut IssueCollector) -> Vec<String> {
        if field.choices.is_empty() {
            return values.iter().map(|v| v.to_string()).collect();
        }

        let valid: Vec<&str> = field.choices.iter().map(|c| c.label.as_str()).collect();
        map_present(values, |row, raw| match field.choice_label_for(raw) {
            Some(label) => label.to_string(),
            None => {
                let issue = issues
                    .issue(Severity::Warning, format!("Unknown categorical value: {}", raw))
                    .with_value(raw)
                    .at_row(row)
                    .with_suggestion(format!("Valid values: {}", valid.join(", ")));
                issues.push(issue);
                raw.to_string()
            }
        })
    }
}

/// Two-valued coded columns (sex, vital status, yes/no).
pub struct BinaryNormalizer;

impl BinaryNormalizer {
    /// Lowercase raw value → canonical label, chosen from the field name first.
    fn mapping_for(field: &FieldDescriptor) -> Vec<(String, String)> {
        let name = field.name.to_lowercase();
        let table = |entries: &[(&str, &str)]| {
            entries
                .iter()
                .map(|(raw, label)| (raw.to_string(), label.to_string()))
                .collect::<Vec<_>>()
        };

        if name.contains("sex") || name.contains("gender") {
            table(SEX_VALUES)
        } else if name.contains("vital") || name.contains("death") {
            table(VITAL_STATUS_VALUES)
        } else if field.choices.len() == 2 {
            field
                .choices
                .iter()
                .flat_map(|c| {
                    [
                        (c.value.to_lowercase(), c.label.clone()),
                        (c.label.to_lowercase(), c.label.clone()),
                    ]
                })
                .collect()
        } else {
            table(YES_NO_VALUES)
        }
    }
}

impl ValueNormalizer for BinaryNormalizer {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn normalize(&self, field: &FieldDescriptor, values: &[&str], issues: &mut IssueCollector) -> Vec<String> {
        let mapping = Self::mapping_for(field);
        map_present(values, |row, raw| {
            let key = raw.trim().to_lowercase();
            match mapping.iter().find(|(k, _)| *k == key) {
                Some((_, label)) => label.clone(),
                None => {
                    let expected: Vec<&str> = mapping.iter().map(|(k, _)| k.as_str()).collect();
                    let issue = issues
                        .issue(Severity::Warning, format!("Unknown binary value: {}", raw))
                        .with_value(raw)
                        .at_row(row)
                        .with_suggestion(format!("Expected values: {}", expected.join(", ")));
                    issues.push(issue);
                    raw.to_string()
                }
            }
        })
    }
}

pub struct BooleanNormalizer;

impl ValueNormalizer for BooleanNormalizer {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn normalize(&self, _field: &FieldDescriptor, values: &[&str], issues: &mut IssueCollector) -> Vec<String> {
        map_present(values, |row, raw| {
            let lowered = raw.trim().to_lowercase();
            if TRUE_VALUES.contains(&lowered.as_str()) {
                "true".to_string()
            } else if FALSE_VALUES.contains(&lowered.as_str()) {
                "false".to_string()
            } else {
                let issue = issues
                    .issue(Severity::Warning, format!("Could not convert to boolean: {}", raw))
                    .with_value(raw)
                    .at_row(row)
                    .with_suggestion("Use true/false, 1/0, or yes/no");
                issues.push(issue);
                raw.to_string()
            }
        })
    }
}

pub struct EmailNormalizer;

impl ValueNormalizer for EmailNormalizer {
    fn name(&self) -> &'static str {
        "email"
    }

    fn normalize(&self, _field: &FieldDescriptor, values: &[&str], issues: &mut IssueCollector) -> Vec<String> {
        map_present(values, |row, raw| {
            let email = raw.trim().to_lowercase();
            if !EMAIL_PATTERN.is_match(&email) {
                let issue = issues
                    .issue(Severity::Warning, "Invalid email format")
                    .with_value(raw)
                    .at_row(row)
                    .with_suggestion("Use format: user@domain.com");
                issues.push(issue);
            }
            email
        })
    }
}

/// North American phone numbers, rendered `XXX-XXX-XXXX`.
pub struct PhoneNormalizer;

impl ValueNormalizer for PhoneNormalizer {
    fn name(&self) -> &'static str {
        "phone"
    }

    fn normalize(&self, _field: &FieldDescriptor, values: &[&str], issues: &mut IssueCollector) -> Vec<String> {
        map_present(values, |row, raw| {
            let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
            match digits.len() {
                10 => format_phone(&digits),
                11 if digits.starts_with('1') => format_phone(&digits[1..]),
                11 => digits,
                n => {
                    let issue = issues
                        .issue(Severity::Warning, format!("Unusual phone number length: {} digits", n))
                        .with_value(raw)
                        .at_row(row)
                        .with_suggestion("US numbers should be 10-11 digits");
                    issues.push(issue);
                    raw.to_string()
                }
            }
        })
    }
}

fn format_phone(digits: &str) -> String {
    format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..])
}

/// Free text and identifiers: trimmed, with declared length bounds.
pub struct TextNormalizer;

impl ValueNormalizer for TextNormalizer {
    fn name(&self) -> &'static str {
        "text"
    }

    fn normalize(&self, field: &FieldDescriptor, values: &[&str], issues: &mut IssueCollector) -> Vec<String> {
        let rules = &field.validation_rules;
        map_present(values, |row, raw| {
            let text = raw.trim().to_string();
            let length = text.chars().count();

            if let Some(max) = rules.max_length.filter(|max| length > *max) {
                let issue = issues
                    .issue(
                        Severity::Warning,
                        format!("Text exceeds maximum length of {} characters", max),
                    )
                    .with_value(raw)
                    .at_row(row)
                    .with_suggestion(format!("Truncate to {} characters", max));
                issues.push(issue);
            }
            if let Some(min) = rules.min_length.filter(|min| length < *min) {
                let issue = issues
                    .issue(
                        Severity::Warning,
                        format!("Text is shorter than minimum length of {} characters", min),
                    )
                    .with_value(raw)
                    .at_row(row);
                issues.push(issue);
            }
            text
        })
    }
}

// =============================================================================
// DATASET NORMALIZER
// =============================================================================

/// Normalizes datasets column by column against a dictionary.
pub struct DataNormalizer {
    config: NormalizerConfig,
}

impl DataNormalizer {
    pub fn new() -> Self {
        Self::with_config(NormalizerConfig::default())
    }

    pub fn with_config(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize every column of `table`.
    ///
    /// Columns described by the dictionary are normalized by their declared
    /// type with full validation. Other columns get an inferred type and
    /// warnings-only validation. Required dictionary fields absent from the
    /// table are reported as one critical issue each.
    pub fn normalize_dataset(&self, table: &DataTable, dictionary: &DataDictionary) -> NormalizedDataset {
        info!(
            records = table.row_count(),
            fields = table.column_count(),
            dictionary = %dictionary.name,
            "normalizing dataset"
        );

        let mut normalized = table.clone();
        let mut issues = Vec::new();
        let mut column_types = IndexMap::new();

        for (index, header) in table.headers.iter().enumerate() {
            let values: Vec<&str> = table.column_values(index).collect();

            let (column_type, cells, column_issues) = match dictionary.get_field(header) {
                Some(field) => {
                    let (cells, column_issues) = self.normalize_field(field, &values);
                    (ColumnType::Declared(field.field_type), cells, column_issues)
                }
                None => {
                    let (inferred, cells, column_issues) = self.normalize_unknown_field(header, &values);
                    (ColumnType::Inferred(inferred), cells, column_issues)
                }
            };

            debug!(
                column = %header,
                field_type = %column_type.field_type(),
                declared = column_type.is_declared(),
                issues = column_issues.len(),
                "normalized column"
            );

            normalized.set_column(index, cells);
            issues.extend(column_issues);
            column_types.insert(header.clone(), column_type);
        }

        for field in dictionary.required_fields() {
            if table.column_index(&field.name).is_none() {
                issues.push(
                    ValidationIssue::new(&field.name, Severity::Critical, "Required field is absent from the dataset")
                        .with_suggestion(format!("Add a '{}' column", field.name)),
                );
            }
        }

        info!(issues = issues.len(), "normalization complete");

        NormalizedDataset {
            table: normalized,
            issues,
            column_types,
        }
    }

    /// Normalize one column by its descriptor.
    pub fn normalize_field(&self, field: &FieldDescriptor, values: &[&str]) -> (Vec<String>, Vec<ValidationIssue>) {
        let mut issues = IssueCollector::new(&field.name);
        let cells = self.run(field, values, &mut issues);
        (cells, issues.into_issues())
    }

    /// Normalize a column the dictionary does not describe.
    ///
    /// Returns the inferred type with the cells and (at most warning) issues.
    pub fn normalize_unknown_field(
        &self,
        name: &str,
        values: &[&str],
    ) -> (FieldType, Vec<String>, Vec<ValidationIssue>) {
        let field = synthesize_descriptor(name, values);
        let mut issues = IssueCollector::capped(name, Severity::Warning);
        let cells = self.run(&field, values, &mut issues);
        (field.field_type, cells, issues.into_issues())
    }

    fn run(&self, field: &FieldDescriptor, values: &[&str], issues: &mut IssueCollector) -> Vec<String> {
        if field.required {
            for (row, value) in values.iter().enumerate() {
                if DataTable::is_null_value(value) {
                    let issue = issues.issue(Severity::Error, "Required field is missing").at_row(row);
                    issues.push(issue);
                }
            }
        }

        let normalizer = self.normalizer_for(field.field_type);
        let cells = normalizer.normalize(field, values, issues);
        apply_rules(field, &cells, issues);
        cells
    }

    /// Type dispatch; identifiers and unresolved types are treated as text.
    fn normalizer_for(&self, field_type: FieldType) -> Box<dyn ValueNormalizer> {
        match field_type {
            FieldType::Integer => Box::new(NumericNormalizer { integer: true }),
            FieldType::Decimal => Box::new(NumericNormalizer { integer: false }),
            FieldType::Date | FieldType::DateTime => Box::new(TemporalNormalizer {
                with_time: field_type == FieldType::DateTime,
                min_year: self.config.min_year,
                max_year: self.config.max_year(),
            }),
            FieldType::Categorical => Box::new(CategoricalNormalizer),
            FieldType::Binary => Box::new(BinaryNormalizer),
            FieldType::Boolean => Box::new(BooleanNormalizer),
            FieldType::Email => Box::new(EmailNormalizer),
            FieldType::Phone => Box::new(PhoneNormalizer),
            FieldType::Text | FieldType::Identifier | FieldType::Unknown => Box::new(TextNormalizer),
        }
    }
}

impl Default for DataNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Relaxed descriptor for an undeclared column: optional, no rules, and
/// observed values as choices for coded types.
fn synthesize_descriptor(name: &str, values: &[&str]) -> FieldDescriptor {
    let field_type = infer_type(values);
    let mut field = FieldDescriptor::new(name, field_type);
    if matches!(field_type, FieldType::Binary | FieldType::Categorical) {
        field.choices = distinct_values(values).into_iter().map(Choice::bare).collect();
    }
    field
}

/// Declared range, regex and uniqueness rules over normalized cells.
fn apply_rules(field: &FieldDescriptor, cells: &[String], issues: &mut IssueCollector) {
    let rules = &field.validation_rules;
    let present = || {
        cells
            .iter()
            .enumerate()
            .filter(|(_, v)| !DataTable::is_null_value(v))
    };

    if let Some(range) = &rules.range {
        for (row, value) in present() {
            let Some(n) = parse_number(value) else {
                continue;
            };
            if let Some(min) = range.min.filter(|min| n < *min) {
                let issue = issues
                    .issue(Severity::Warning, format!("Value {} is below minimum {}", value, min))
                    .with_value(value.as_str())
                    .at_row(row);
                issues.push(issue);
            }
            if let Some(max) = range.max.filter(|max| n > *max) {
                let issue = issues
                    .issue(Severity::Warning, format!("Value {} is above maximum {}", value, max))
                    .with_value(value.as_str())
                    .at_row(row);
                issues.push(issue);
            }
        }
    }

    if let Some(pattern) = &rules.regex {
        match Regex::new(pattern) {
            Ok(re) => {
                for (row, value) in present() {
                    // The pattern must match from the first character.
                    if !re.find(value).is_some_and(|m| m.start() == 0) {
                        let issue = issues
                            .issue(
                                Severity::Warning,
                                format!("Value does not match required pattern: {}", pattern),
                            )
                            .with_value(value.as_str())
                            .at_row(row);
                        issues.push(issue);
                    }
                }
            }
            Err(e) => {
                let issue = issues.issue(Severity::Error, format!("Regex validation failed: {}", e));
                issues.push(issue);
            }
        }
    }

    if rules.unique {
        let mut seen = HashSet::new();
        for (row, value) in present() {
            if !seen.insert(value.as_str()) {
                let issue = issues
                    .issue(Severity::Error, format!("Duplicate value found: {}", value))
                    .with_value(value.as_str())
                    .at_row(row)
                    .with_suggestion("Values in this field must be unique");
                issues.push(issue);
            }
        }
    }
}
