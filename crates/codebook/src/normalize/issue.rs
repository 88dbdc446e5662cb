//! Validation issues raised while normalizing a dataset.

use serde::{Deserialize, Serialize};

/// Severity level of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational only, may not require action.
    Info,
    /// Potential issue that should be reviewed.
    Warning,
    /// Definite issue that should be addressed.
    Error,
    /// The dataset cannot be trusted for this field.
    Critical,
}

impl Severity {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Critical => "Critical",
        }
    }

    /// Penalty weight used by the validity score.
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Info => 0.05,
            Severity::Warning => 0.2,
            Severity::Error => 0.5,
            Severity::Critical => 1.0,
        }
    }
}

/// A single data-quality problem found in a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Affected column name.
    pub field: String,
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// The offending raw value.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<String>,
    /// 0-based row position in the dataset.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub row_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue.
    pub fn new(field: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            severity,
            message: message.into(),
            value: None,
            row_index: None,
            suggestion: None,
        }
    }

    /// Set the offending value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the row position.
    pub fn at_row(mut self, row: usize) -> Self {
        self.row_index = Some(row);
        self
    }

    /// Set the suggested fix.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Accumulates issues for one column.
///
/// A collector built with [`IssueCollector::capped`] lowers every issue
/// above the cap to the cap, which is how columns missing from the
/// dictionary get relaxed (warnings-only) validation.
#[derive(Debug, Clone)]
pub struct IssueCollector {
    field: String,
    cap: Option<Severity>,
    issues: Vec<ValidationIssue>,
}

impl IssueCollector {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            cap: None,
            issues: Vec::new(),
        }
    }

    pub fn capped(field: impl Into<String>, cap: Severity) -> Self {
        Self {
            cap: Some(cap),
            ..Self::new(field)
        }
    }

    /// Field the collector reports on.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Start an issue for this collector's field; finish it with [`push`](Self::push).
    pub fn issue(&self, severity: Severity, message: impl Into<String>) -> ValidationIssue {
        ValidationIssue::new(self.field.clone(), severity, message)
    }

    pub fn push(&mut self, mut issue: ValidationIssue) {
        if let Some(cap) = self.cap {
            issue.severity = issue.severity.min(cap);
        }
        self.issues.push(issue);
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering_and_weights() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
        assert_eq!(Severity::Critical.weight(), 1.0);
        assert_eq!(Severity::Warning.label(), "Warning");
    }

    #[test]
    fn test_issue_builder() {
        let issue = ValidationIssue::new("age", Severity::Warning, "Value could not be converted to integer")
            .with_value("abc")
            .at_row(3)
            .with_suggestion("Check for non-numeric characters");

        assert_eq!(issue.value.as_deref(), Some("abc"));
        assert_eq!(issue.row_index, Some(3));
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["severity"], "warning");
    }

    #[test]
    fn test_capped_collector_lowers_severity() {
        let mut collector = IssueCollector::capped("extra", Severity::Warning);
        let error = collector.issue(Severity::Error, "Duplicate value");
        collector.push(error);
        let info = collector.issue(Severity::Info, "note");
        collector.push(info);

        let issues = collector.into_issues();
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[1].severity, Severity::Info);
    }
}
