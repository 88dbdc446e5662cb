//! Dictionary-level container for field descriptors.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::field::FieldDescriptor;
use super::types::{FieldType, SourceFormat};

/// A parsed data dictionary: an ordered set of uniquely named fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDictionary {
    /// Dictionary name (usually the source file stem).
    pub name: String,
    /// Container format the dictionary was read from.
    pub source_format: SourceFormat,
    #[serde(default)]
    pub version: String,
    /// Free-form metadata captured from the source document.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, serde_json::Value>,
    /// Fields keyed by name, in insertion order.
    #[serde(default)]
    pub fields: IndexMap<String, FieldDescriptor>,
}

impl DataDictionary {
    /// Create an empty dictionary.
    pub fn new(name: impl Into<String>, source_format: SourceFormat) -> Self {
        Self {
            name: name.into(),
            source_format,
            version: "1.0".to_string(),
            metadata: IndexMap::new(),
            fields: IndexMap::new(),
        }
    }

    /// Add a field, replacing any existing field with the same name in place.
    pub fn add_field(&mut self, field: FieldDescriptor) {
        self.fields.insert(field.name.clone(), field);
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// All field names in insertion order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields declared with the given type.
    pub fn fields_by_type(&self, field_type: FieldType) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values().filter(move |f| f.field_type == field_type)
    }

    /// Fields marked as required.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values().filter(|f| f.required)
    }

    /// Mean confidence across all fields (0.0 for an empty dictionary).
    pub fn mean_confidence(&self) -> f64 {
        if self.fields.is_empty() {
            return 0.0;
        }
        self.fields.values().map(|f| f.confidence_score).sum::<f64>() / self.fields.len() as f64
    }

    /// Convert into a plain key/value representation for transport.
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild a dictionary from its key/value representation.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
