//! YAML dictionary reader.
//!
//! The document is converted into the JSON value shape and handed to the
//! JSON structural logic.

use serde_json::{Map, Number, Value};
use serde_yaml::Value as YamlValue;

use super::json::build_dictionary_from_value;
use super::{DictionaryParser, DictionarySource};
use crate::error::Result;
use crate::schema::{DataDictionary, SourceFormat};

/// Parses YAML data dictionaries.
pub struct YamlDictionaryParser;

impl DictionaryParser for YamlDictionaryParser {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn parse(&self, source: &DictionarySource) -> Result<DataDictionary> {
        let document: YamlValue = serde_yaml::from_str(&source.content)?;
        let value = yaml_to_json(document);
        build_dictionary_from_value(&source.name, &value, SourceFormat::Yaml)
    }
}

/// Convert a YAML tree into a JSON tree, stringifying mapping keys.
pub(crate) fn yaml_to_json(value: YamlValue) -> Value {
    match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(mapping) => {
            let mut object = Map::new();
            for (key, value) in mapping {
                object.insert(key_text(key), yaml_to_json(value));
            }
            Value::Object(object)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn key_text(key: YamlValue) -> String {
    match key {
        YamlValue::String(s) => s,
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
