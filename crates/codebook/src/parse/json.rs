//! JSON dictionary reader. Also the shared structural logic for YAML.

use serde_json::{Map, Value};

use super::{DictionaryParser, DictionarySource, is_required_flag};
use crate::error::{CodebookError, Result};
use crate::schema::{Choice, DataDictionary, FieldDescriptor, FieldType, SourceFormat, ValidationRules};

/// Keys that may hold the field collection, in priority order.
const FIELD_CONTAINER_KEYS: &[&str] = &["fields", "variables", "columns", "schema"];

/// Top-level keys describing the dictionary itself rather than a field.
const RESERVED_KEYS: &[&str] = &["metadata", "version", "name"];

/// Parses JSON data dictionaries.
pub struct JsonDictionaryParser;

impl DictionaryParser for JsonDictionaryParser {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, source: &DictionarySource) -> Result<DataDictionary> {
        let value: Value = serde_json::from_str(&source.content)?;
        build_dictionary_from_value(&source.name, &value, SourceFormat::Json)
    }
}

/// Build a dictionary from an already-decoded document tree.
pub(crate) fn build_dictionary_from_value(
    name: &str,
    value: &Value,
    format: SourceFormat,
) -> Result<DataDictionary> {
    let mut dictionary = DataDictionary::new(name, format);

    match value {
        Value::Object(root) => {
            capture_dictionary_attributes(&mut dictionary, root);

            let container = FIELD_CONTAINER_KEYS.iter().find_map(|key| root.get(*key));
            match container {
                Some(Value::Object(fields)) => add_mapped_fields(&mut dictionary, fields.iter())?,
                Some(Value::Array(items)) => add_listed_fields(&mut dictionary, items)?,
                Some(other) => {
                    return Err(CodebookError::UnsupportedFormat(format!(
                        "field collection must be a mapping or list, found {}",
                        kind_of(other)
                    )));
                }
                None => {
                    let fields = root
                        .iter()
                        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()));
                    add_mapped_fields(&mut dictionary, fields)?;
                }
            }
        }
        Value::Array(items) => add_listed_fields(&mut dictionary, items)?,
        other => {
            return Err(CodebookError::UnsupportedFormat(format!(
                "dictionary document must be a mapping or list, found {}",
                kind_of(other)
            )));
        }
    }

    Ok(dictionary)
}

fn capture_dictionary_attributes(dictionary: &mut DataDictionary, root: &Map<String, Value>) {
    if let Some(Value::Object(metadata)) = root.get("metadata") {
        for (key, value) in metadata {
            dictionary.metadata.insert(key.clone(), value.clone());
        }
    }
    if let Some(version) = root.get("version").and_then(scalar_text) {
        dictionary.version = version;
    }
    if let Some(Value::String(name)) = root.get("name") {
        if !name.trim().is_empty() {
            dictionary.name = name.trim().to_string();
        }
    }
}

fn add_mapped_fields<'a>(
    dictionary: &mut DataDictionary,
    fields: impl Iterator<Item = (&'a String, &'a Value)>,
) -> Result<()> {
    for (name, definition) in fields {
        dictionary.add_field(parse_field(name, definition)?);
    }
    Ok(())
}

fn add_listed_fields(dictionary: &mut DataDictionary, items: &[Value]) -> Result<()> {
    for item in items {
        let Value::Object(definition) = item else {
            continue;
        };
        let name = ["name", "field"]
            .iter()
            .find_map(|key| definition.get(*key).and_then(scalar_text))
            .filter(|name| !name.trim().is_empty());
        if let Some(name) = name {
            dictionary.add_field(parse_field(name.trim(), item)?);
        }
    }
    Ok(())
}

fn parse_field(name: &str, definition: &Value) -> Result<FieldDescriptor> {
    let mut field = FieldDescriptor::new(name, FieldType::Unknown);

    let definition = match definition {
        Value::String(type_name) => {
            field.field_type = FieldType::from_source_name(type_name);
            return Ok(field.finalize());
        }
        Value::Object(definition) => definition,
        other => {
            return Err(CodebookError::UnsupportedFormat(format!(
                "definition of field '{}' must be a mapping or type name, found {}",
                name,
                kind_of(other)
            )));
        }
    };

    if let Some(label) = first_text(definition, &["label", "title"]) {
        field.label = label;
    }
    if let Some(description) = first_text(definition, &["description", "help_text"]) {
        field.description = description;
    }
    if let Some(type_name) = first_text(definition, &["type", "field_type"]) {
        field.field_type = FieldType::from_source_name(&type_name);
    }
    field.required = definition.get("required").is_some_and(value_is_truthy);
    field.section = first_text(definition, &["section", "category"]);
    field.field_note = first_text(definition, &["note", "field_note"]);
    field.branching_logic = first_text(definition, &["branching_logic"]);
    field.units = first_text(definition, &["units", "unit"]);

    if let Some(choices) = ["choices", "options", "enum"]
        .iter()
        .find_map(|key| definition.get(*key))
    {
        field.choices = parse_choice_value(choices);
    }

    if let Some(Value::Object(rules)) = ["validation", "constraints"]
        .iter()
        .find_map(|key| definition.get(*key))
    {
        field.validation_rules = parse_rules_value(rules);
    }

    if let Some(Value::Object(metadata)) = definition.get("metadata") {
        field.metadata = metadata.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    }

    Ok(field.finalize())
}

/// Decode choices given as scalars, `{value, label}` objects, or a mapping.
fn parse_choice_value(value: &Value) -> Vec<Choice> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(entry) => {
                    let value = ["value", "code"].iter().find_map(|k| entry.get(*k).and_then(scalar_text))?;
                    let label = ["label", "name", "display"]
                        .iter()
                        .find_map(|k| entry.get(*k).and_then(scalar_text))
                        .unwrap_or_else(|| value.clone());
                    Some(Choice::new(value, label))
                }
                other => scalar_text(other).map(Choice::bare),
            })
            .collect(),
        Value::Object(entries) => entries
            .iter()
            .map(|(key, label)| {
                let label = scalar_text(label).unwrap_or_else(|| key.clone());
                Choice::new(key.clone(), label)
            })
            .collect(),
        Value::String(raw) => super::parse_choices(raw),
        _ => Vec::new(),
    }
}

/// Decode a validation/constraints mapping into typed rules.
///
/// Unrecognized entries, and values of the wrong shape for their rule, are
/// kept in [`ValidationRules::extra`].
pub(crate) fn parse_rules_value(rules: &Map<String, Value>) -> ValidationRules {
    let mut parsed = ValidationRules::new();
    let mut min = None;
    let mut max = None;

    for (key, value) in rules {
        match key.as_str() {
            "range" => {
                if let Value::Object(range) = value {
                    min = range.get("min").and_then(number_of).or(min);
                    max = range.get("max").and_then(number_of).or(max);
                } else {
                    parsed.keep_extra(key, value.clone());
                }
            }
            "min" | "minimum" if number_of(value).is_some() => min = number_of(value),
            "max" | "maximum" if number_of(value).is_some() => max = number_of(value),
            "regex" | "pattern" if value.is_string() => parsed.regex = scalar_text(value),
            "unique" => parsed.unique = value_is_truthy(value),
            "min_length" | "minLength" if value.as_u64().is_some() => {
                parsed.min_length = value.as_u64().map(|n| n as usize)
            }
            "max_length" | "maxLength" if value.as_u64().is_some() => {
                parsed.max_length = value.as_u64().map(|n| n as usize)
            }
            "validation_type" | "format" => parsed.validation_type = scalar_text(value),
            _ => parsed.keep_extra(key, value.clone()),
        }
    }

    parsed.with_range(min, max)
}

fn first_text(definition: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| definition.get(*key).and_then(scalar_text))
        .filter(|text| !text.trim().is_empty())
}

/// Text form of a scalar; `None` for null, arrays and objects.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn value_is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => is_required_flag(s),
        _ => false,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
