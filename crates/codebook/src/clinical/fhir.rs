//! FHIR R4 Bundle reader: derives field descriptors from example resources.

use indexmap::IndexSet;
use serde_json::{Map, Value};

use super::title_case;
use crate::error::{CodebookError, Result};
use crate::parse::{DictionaryParser, DictionarySource};
use crate::schema::{DataDictionary, FieldDescriptor, FieldType, SourceFormat};

/// Deepest nesting level walked below a resource root.
const MAX_DEPTH: usize = 3;

/// Elements every resource must carry.
const REQUIRED_ELEMENTS: &[&str] = &["id", "resourceType"];

/// String elements whose values come from small coded sets.
const CODED_ELEMENTS: &[&str] = &["status", "gender", "class"];

/// Parses FHIR Bundles (or bare arrays of resources) into a dictionary.
///
/// Every scalar leaf becomes one field named `ResourceType.dotted.path`;
/// arrays contribute their first element only.
pub struct FhirParser;

impl DictionaryParser for FhirParser {
    fn name(&self) -> &'static str {
        "fhir"
    }

    fn parse(&self, source: &DictionarySource) -> Result<DataDictionary> {
        let document: Value = serde_json::from_str(&source.content)?;
        let resources = resources_of(&document).ok_or_else(|| {
            CodebookError::UnsupportedFormat("not a FHIR Bundle or resource list".to_string())
        })?;

        let mut dictionary = DataDictionary::new(&source.name, SourceFormat::Json);
        dictionary.version = "R4".to_string();
        let mut resource_types: IndexSet<String> = IndexSet::new();

        for resource in resources {
            let Some(resource_type) = resource.get("resourceType").and_then(Value::as_str) else {
                continue;
            };
            resource_types.insert(resource_type.to_string());

            let mut leaves = Vec::new();
            collect_leaves(resource, "", 0, &mut leaves);
            for (path, element, value) in leaves {
                let name = format!("{}.{}", resource_type, path);
                // First occurrence of a (resource type, path) pair wins.
                if dictionary.get_field(&name).is_some() {
                    continue;
                }
                dictionary.add_field(build_field(name, resource_type, &path, element, value));
            }
        }

        dictionary.metadata.insert("source_type".into(), Value::from("fhir_r4"));
        dictionary.metadata.insert(
            "resource_types".into(),
            Value::Array(resource_types.into_iter().map(Value::String).collect()),
        );

        Ok(dictionary)
    }
}

/// Whether a decoded JSON document looks like FHIR content.
pub(crate) fn is_fhir_document(document: &Value) -> bool {
    match document {
        Value::Object(root) => root.get("resourceType").and_then(Value::as_str) == Some("Bundle"),
        Value::Array(items) => items
            .first()
            .and_then(Value::as_object)
            .is_some_and(|first| first.contains_key("resourceType") || first.contains_key("resource")),
        _ => false,
    }
}

fn resources_of(document: &Value) -> Option<Vec<&Map<String, Value>>> {
    if !is_fhir_document(document) {
        return None;
    }

    let entries: &[Value] = match document {
        Value::Object(root) => root.get("entry").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]),
        Value::Array(items) => items.as_slice(),
        _ => &[],
    };

    Some(
        entries
            .iter()
            .filter_map(|entry| {
                let entry = entry.as_object()?;
                match entry.get("resource") {
                    Some(Value::Object(resource)) => Some(resource),
                    _ => Some(entry),
                }
            })
            .collect(),
    )
}

fn collect_leaves<'a>(
    object: &'a Map<String, Value>,
    prefix: &str,
    depth: usize,
    out: &mut Vec<(String, &'a str, &'a Value)>,
) {
    if depth > MAX_DEPTH {
        return;
    }

    for (key, value) in object {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => out.push((path, key.as_str(), value)),
            Value::Array(items) => {
                if let Some(Value::Object(first)) = items.first() {
                    collect_leaves(first, &path, depth + 1, out);
                } else if let Some(first) = items.first().filter(|v| !v.is_null() && !v.is_array()) {
                    out.push((path, key.as_str(), first));
                }
            }
            Value::Object(child) => collect_leaves(child, &path, depth + 1, out),
            Value::Null => {}
        }
    }
}

fn build_field(name: String, resource_type: &str, path: &str, element: &str, value: &Value) -> FieldDescriptor {
    let mut field = FieldDescriptor::new(name, infer_type(value, element))
        .with_label(title_case(element))
        .with_description(format!("FHIR {} element: {}", resource_type, path))
        .with_required(path == element && REQUIRED_ELEMENTS.contains(&element))
        .with_metadata("fhir_resource_type", resource_type)
        .with_metadata("fhir_element", element)
        .with_metadata("fhir_path", path);
    field.section = Some(resource_type.to_string());
    field.finalize()
}

fn infer_type(value: &Value, element: &str) -> FieldType {
    match value {
        Value::Bool(_) => FieldType::Boolean,
        Value::Number(n) if n.is_i64() || n.is_u64() => FieldType::Integer,
        Value::Number(_) => FieldType::Decimal,
        Value::String(_) => {
            let lowered = element.to_lowercase();
            if lowered.contains("datetime") || lowered.ends_with("instant") {
                FieldType::DateTime
            } else if lowered.contains("date") {
                FieldType::Date
            } else if lowered.contains("time") {
                FieldType::DateTime
            } else if CODED_ELEMENTS.contains(&lowered.as_str()) {
                FieldType::Categorical
            } else {
                FieldType::Text
            }
        }
        _ => FieldType::Text,
    }
}
