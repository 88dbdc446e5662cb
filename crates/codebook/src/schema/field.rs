//! Field descriptor definition and validation rules.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::confidence;
use super::types::{Choice, FieldType};

/// Declared numeric bounds for a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl RangeRule {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// A range with neither bound is treated as absent.
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Check a value against both bounds (inclusive).
    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// Serialized names of the typed [`ValidationRules`] slots.
const TYPED_RULE_KEYS: &[&str] = &["range", "regex", "unique", "min_length", "max_length", "validation_type"];

/// Validation rules declared for a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Named validation flavour from the source tool (e.g. `date_ymd`, `email`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_type: Option<String>,
    /// Rule entries with no dedicated slot, kept in source order.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl ValidationRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no rule is declared.
    pub fn is_empty(&self) -> bool {
        self.range.is_none_or(|r| r.is_empty())
            && self.regex.is_none()
            && !self.unique
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.validation_type.is_none()
            && self.extra.is_empty()
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        let range = RangeRule::new(min, max);
        self.range = if range.is_empty() { None } else { Some(range) };
        self
    }

    pub fn with_regex(mut self, pattern: impl Into<String>) -> Self {
        self.regex = Some(pattern.into());
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_validation_type(mut self, validation_type: impl Into<String>) -> Self {
        self.validation_type = Some(validation_type.into());
        self
    }

    /// Keep an entry with no typed slot in [`ValidationRules::extra`].
    ///
    /// Keys naming a typed rule are stored as `raw_<key>` so the flattened
    /// form deserializes back into the same rules.
    pub fn keep_extra(&mut self, key: &str, value: serde_json::Value) {
        let key = if TYPED_RULE_KEYS.contains(&key) {
            format!("raw_{}", key)
        } else {
            key.to_string()
        };
        self.extra.insert(key, value);
    }
}

/// Metadata describing one logical data column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name, unique within a dictionary.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Declared data type.
    pub field_type: FieldType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    /// Permitted values, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub validation_rules: ValidationRules,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branching_logic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_note: Option<String>,
    /// Format-specific provenance (form name, source table, resource path).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, serde_json::Value>,
    /// Completeness score in [0, 1], derived from the other attributes.
    #[serde(default)]
    pub confidence_score: f64,
}

impl FieldDescriptor {
    /// Create a descriptor whose label defaults to its name.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            field_type,
            description: String::new(),
            required: false,
            choices: Vec::new(),
            validation_rules: ValidationRules::default(),
            section: None,
            branching_logic: None,
            units: None,
            field_note: None,
            metadata: IndexMap::new(),
            confidence_score: 0.0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.validation_rules = rules;
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Complete a freshly parsed descriptor.
    ///
    /// Empty labels fall back to the name, an unresolved type carrying
    /// choices becomes categorical, and the confidence score is computed.
    /// Parsers call this exactly once per descriptor.
    pub fn finalize(mut self) -> Self {
        if self.label.trim().is_empty() {
            self.label = self.name.clone();
        }
        if self.field_type == FieldType::Unknown && !self.choices.is_empty() {
            self.field_type = FieldType::Categorical;
        }
        self.confidence_score = confidence::score(&self);
        self
    }

    /// Look up the canonical label for a raw value, matching choice values
    /// and labels case-insensitively.
    pub fn choice_label_for(&self, raw: &str) -> Option<&str> {
        let needle = raw.trim().to_lowercase();
        self.choices
            .iter()
            .find(|c| c.value.to_lowercase() == needle || c.label.to_lowercase() == needle)
            .map(|c| c.label.as_str())
    }
}
