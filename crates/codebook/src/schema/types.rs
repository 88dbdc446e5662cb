//! Core type definitions for field descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared or inferred data type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Free text.
    Text,
    /// Whole numbers.
    Integer,
    /// Floating-point numbers.
    Decimal,
    /// Calendar date without a time component.
    Date,
    /// Date with a time component.
    DateTime,
    /// True/false values.
    Boolean,
    /// Values drawn from a declared set of choices.
    Categorical,
    /// Two-valued coded variable (sex, vital status, yes/no).
    Binary,
    /// Record or subject identifier.
    Identifier,
    /// Email address.
    Email,
    /// Phone number.
    Phone,
    /// Type could not be resolved.
    #[default]
    Unknown,
}

/// Source type names and the field type each resolves to.
///
/// Lookups are case-insensitive; anything not listed resolves to
/// [`FieldType::Unknown`].
const TYPE_SYNONYMS: &[(&str, FieldType)] = &[
    // Text
    ("text", FieldType::Text),
    ("string", FieldType::Text),
    ("varchar", FieldType::Text),
    ("char", FieldType::Text),
    ("notes", FieldType::Text),
    ("textarea", FieldType::Text),
    // Numeric
    ("number", FieldType::Decimal),
    ("numeric", FieldType::Decimal),
    ("float", FieldType::Decimal),
    ("decimal", FieldType::Decimal),
    ("double", FieldType::Decimal),
    ("int", FieldType::Integer),
    ("integer", FieldType::Integer),
    // Dates
    ("date", FieldType::Date),
    ("date_mdy", FieldType::Date),
    ("date_dmy", FieldType::Date),
    ("date_ymd", FieldType::Date),
    ("datetime", FieldType::DateTime),
    ("timestamp", FieldType::DateTime),
    // Boolean
    ("boolean", FieldType::Boolean),
    ("bool", FieldType::Boolean),
    ("yesno", FieldType::Boolean),
    ("truefalse", FieldType::Boolean),
    ("checkbox", FieldType::Boolean),
    // Categorical
    ("dropdown", FieldType::Categorical),
    ("radio", FieldType::Categorical),
    ("select", FieldType::Categorical),
    ("enum", FieldType::Categorical),
    ("categorical", FieldType::Categorical),
    ("binary", FieldType::Binary),
    // Special
    ("email", FieldType::Email),
    ("phone", FieldType::Phone),
    ("identifier", FieldType::Identifier),
    ("record_id", FieldType::Identifier),
    ("auto_increment", FieldType::Identifier),
];

impl FieldType {
    /// Resolve a source type name (e.g. `"dropdown"`, `"varchar"`) to a field type.
    pub fn from_source_name(name: &str) -> FieldType {
        let key = name.trim().to_lowercase();
        TYPE_SYNONYMS
            .iter()
            .find(|(synonym, _)| *synonym == key)
            .map(|(_, field_type)| *field_type)
            .unwrap_or(FieldType::Unknown)
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Decimal => "decimal",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Boolean => "boolean",
            FieldType::Categorical => "categorical",
            FieldType::Binary => "binary",
            FieldType::Identifier => "identifier",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Unknown => "unknown",
        }
    }

    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Decimal)
    }

    /// Returns true if this type is temporal.
    pub fn is_temporal(&self) -> bool {
        matches!(self, FieldType::Date | FieldType::DateTime)
    }

    /// Returns true if values are drawn from a small discrete set.
    pub fn is_discrete(&self) -> bool {
        matches!(
            self,
            FieldType::Categorical | FieldType::Binary | FieldType::Boolean
        )
    }

    /// Returns true if this type is stored as free-form text.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::Identifier | FieldType::Email | FieldType::Phone
        )
    }

    /// Whether two types fall in the same compatibility group.
    ///
    /// Groups: {integer, decimal}, {date, datetime},
    /// {binary, boolean, categorical}, {text, identifier}.
    pub fn is_compatible_with(&self, other: FieldType) -> bool {
        const GROUPS: &[&[FieldType]] = &[
            &[FieldType::Integer, FieldType::Decimal],
            &[FieldType::Date, FieldType::DateTime],
            &[FieldType::Binary, FieldType::Boolean, FieldType::Categorical],
            &[FieldType::Text, FieldType::Identifier],
        ];

        GROUPS
            .iter()
            .any(|group| group.contains(self) && group.contains(&other))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container format a dictionary was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    #[default]
    Csv,
    Json,
    Yaml,
    Xml,
}

impl SourceFormat {
    /// Lowercase format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Json => "json",
            SourceFormat::Yaml => "yaml",
            SourceFormat::Xml => "xml",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "json" => Ok(SourceFormat::Json),
            "yaml" | "yml" => Ok(SourceFormat::Yaml),
            "xml" => Ok(SourceFormat::Xml),
            _ => Err(format!("Unknown format: {}. Use csv, json, yaml, or xml.", s)),
        }
    }
}

/// One permitted value of a categorical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Stored (coded) value.
    pub value: String,
    /// Human-readable label.
    pub label: String,
}

impl Choice {
    /// Create a choice with distinct value and label.
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Create a choice whose value doubles as its label.
    pub fn bare(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_synonyms() {
        assert_eq!(FieldType::from_source_name("Dropdown"), FieldType::Categorical);
        assert_eq!(FieldType::from_source_name("varchar"), FieldType::Text);
        assert_eq!(FieldType::from_source_name("number"), FieldType::Decimal);
        assert_eq!(FieldType::from_source_name(" int "), FieldType::Integer);
        assert_eq!(FieldType::from_source_name("date_ymd"), FieldType::Date);
        assert_eq!(FieldType::from_source_name("yesno"), FieldType::Boolean);
        assert_eq!(FieldType::from_source_name("slider"), FieldType::Unknown);
    }

    #[test]
    fn test_compatibility_groups() {
        assert!(FieldType::Integer.is_compatible_with(FieldType::Decimal));
        assert!(FieldType::Boolean.is_compatible_with(FieldType::Categorical));
        assert!(FieldType::Identifier.is_compatible_with(FieldType::Text));
        assert!(!FieldType::Date.is_compatible_with(FieldType::Text));
        assert!(!FieldType::Email.is_compatible_with(FieldType::Text));
    }

    #[test]
    fn test_source_format_parse() {
        assert_eq!("YML".parse::<SourceFormat>(), Ok(SourceFormat::Yaml));
        assert!("parquet".parse::<SourceFormat>().is_err());
    }
}
