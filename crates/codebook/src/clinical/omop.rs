//! OMOP Common Data Model column specification reader.

use std::collections::HashMap;

use indexmap::IndexSet;
use serde_json::Value;

use super::title_case;
use crate::error::{CodebookError, Result};
use crate::parse::{DictionaryParser, DictionarySource};
use crate::schema::{DataDictionary, FieldDescriptor, FieldType, SourceFormat, ValidationRules};

/// Headers every OMOP specification sheet carries.
pub(crate) const OMOP_REQUIRED_HEADERS: &[&str] = &["table_name", "column_name", "data_type"];

/// One specification row before names are qualified.
struct ColumnSpec {
    table: String,
    column: String,
    data_type: String,
    nullable: Option<String>,
    description: Option<String>,
    vocabulary: Option<String>,
}

/// Parses OMOP CDM table/column specifications exported as CSV.
pub struct OmopParser;

impl DictionaryParser for OmopParser {
    fn name(&self) -> &'static str {
        "omop"
    }

    fn parse(&self, source: &DictionarySource) -> Result<DataDictionary> {
        let specs = read_specs(&source.content)?;

        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        for spec in &specs {
            *occurrences.entry(spec.column.as_str()).or_default() += 1;
        }

        let mut dictionary = DataDictionary::new(&source.name, SourceFormat::Csv);
        dictionary.version = "6.0".to_string();
        let mut tables: IndexSet<&str> = IndexSet::new();

        for spec in &specs {
            tables.insert(spec.table.as_str());
            let qualified = occurrences.get(spec.column.as_str()).copied().unwrap_or(0) > 1;
            dictionary.add_field(build_field(spec, qualified));
        }

        dictionary.metadata.insert("source_type".into(), Value::from("omop_cdm"));
        dictionary.metadata.insert(
            "tables".into(),
            Value::Array(tables.into_iter().map(Value::from).collect()),
        );

        Ok(dictionary)
    }
}

fn read_specs(content: &str) -> Result<Vec<ColumnSpec>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_lowercase()).collect();
    let header = |name: &str| headers.iter().position(|h| h == name);

    let (Some(table_idx), Some(column_idx), Some(type_idx)) =
        (header("table_name"), header("column_name"), header("data_type"))
    else {
        return Err(CodebookError::UnsupportedFormat(format!(
            "OMOP specification requires headers: {}",
            OMOP_REQUIRED_HEADERS.join(", ")
        )));
    };
    let nullable_idx = header("is_nullable");
    let description_idx = header("description");
    let vocabulary_idx = header("vocabulary_id");

    let mut specs = Vec::new();
    for result in reader.records() {
        let record = result?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let Some(column) = cell(Some(column_idx)) else {
            continue;
        };
        specs.push(ColumnSpec {
            table: cell(Some(table_idx)).unwrap_or_default(),
            column,
            data_type: cell(Some(type_idx)).unwrap_or_else(|| "varchar".to_string()),
            nullable: cell(nullable_idx),
            description: cell(description_idx),
            vocabulary: cell(vocabulary_idx),
        });
    }

    Ok(specs)
}

fn build_field(spec: &ColumnSpec, qualified: bool) -> FieldDescriptor {
    let name = if qualified && !spec.table.is_empty() {
        format!("{}.{}", spec.table, spec.column)
    } else {
        spec.column.clone()
    };

    let is_concept = spec.column.to_lowercase().contains("_concept_id");
    let field_type = if is_concept {
        FieldType::Categorical
    } else {
        map_data_type(&spec.data_type)
    };

    let mut field = FieldDescriptor::new(name, field_type).with_label(title_case(&spec.column));
    if let Some(description) = &spec.description {
        field.description = description.clone();
    }
    field.required = spec
        .nullable
        .as_deref()
        .is_some_and(|n| n.eq_ignore_ascii_case("no"));
    field.validation_rules = plausibility_rules(&spec.column, field_type);

    field.metadata.insert("omop_table".into(), Value::from(spec.table.as_str()));
    field.metadata.insert("omop_data_type".into(), Value::from(spec.data_type.as_str()));
    field.metadata.insert("is_concept_field".into(), Value::Bool(is_concept));
    if let Some(vocabulary) = &spec.vocabulary {
        field.metadata.insert("vocabulary_id".into(), Value::from(vocabulary.as_str()));
    }

    field.finalize()
}

fn map_data_type(data_type: &str) -> FieldType {
    let lowered = data_type.to_lowercase();
    // Strip length/precision suffixes such as varchar(50) or numeric(10,2).
    let base = lowered.split('(').next().unwrap_or("").trim();
    match base {
        "integer" | "int" | "bigint" | "smallint" => FieldType::Integer,
        "numeric" | "float" | "decimal" | "double" | "real" => FieldType::Decimal,
        "date" => FieldType::Date,
        "datetime" | "timestamp" | "datetime2" => FieldType::DateTime,
        _ => FieldType::Text,
    }
}

/// Conventional value ranges for OMOP integer columns (ids, year/month/day parts).
fn plausibility_rules(column: &str, field_type: FieldType) -> ValidationRules {
    if field_type != FieldType::Integer {
        return ValidationRules::new();
    }

    let column = column.to_lowercase();
    let (mut min, mut max) = (None, None);
    if column.ends_with("_id") {
        min = Some(1.0);
    }
    if column.contains("year") {
        (min, max) = (Some(1900.0), Some(2100.0));
    }
    if column.contains("month") {
        (min, max) = (Some(1.0), Some(12.0));
    }
    if column.contains("day") {
        (min, max) = (Some(1.0), Some(31.0));
    }

    ValidationRules::new().with_range(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = "\
table_name,column_name,data_type,is_nullable,description,vocabulary_id
person,person_id,bigint,No,Unique person identifier,
person,gender_concept_id,integer,No,Gender concept,Gender
person,year_of_birth,integer,No,,
person,month_of_birth,integer,Yes,,
measurement,person_id,bigint,No,Person reference,
measurement,value_as_number,\"numeric(10,2)\",Yes,,
measurement,measurement_date,date,No,,
";

    fn parse() -> DataDictionary {
        OmopParser.parse(&DictionarySource::from_text("cdm", SPEC)).unwrap()
    }

    #[test]
    fn test_types_and_ranges() {
        let dict = parse();

        let concept = dict.get_field("gender_concept_id").unwrap();
        assert_eq!(concept.field_type, FieldType::Categorical);
        assert_eq!(concept.label, "Gender Concept Id");
        assert_eq!(concept.metadata.get("vocabulary_id"), Some(&Value::from("Gender")));

        let year = dict.get_field("year_of_birth").unwrap();
        let range = year.validation_rules.range.unwrap();
        assert_eq!((range.min, range.max), (Some(1900.0), Some(2100.0)));
        assert!(year.required);

        let month = dict.get_field("month_of_birth").unwrap();
        assert!(!month.required);
        assert_eq!(month.validation_rules.range.unwrap().max, Some(12.0));

        assert_eq!(dict.get_field("value_as_number").unwrap().field_type, FieldType::Decimal);
        assert_eq!(dict.get_field("measurement_date").unwrap().field_type, FieldType::Date);
    }

    #[test]
    fn test_shared_columns_are_qualified() {
        let dict = parse();
        assert!(dict.get_field("person_id").is_none());
        let person = dict.get_field("person.person_id").unwrap();
        assert_eq!(person.validation_rules.range.unwrap().min, Some(1.0));
        assert!(dict.get_field("measurement.person_id").is_some());
        assert_eq!(dict.len(), 7);
        assert_eq!(
            dict.metadata.get("tables"),
            Some(&serde_json::json!(["person", "measurement"]))
        );
    }

    #[test]
    fn test_missing_headers() {
        let result = OmopParser.parse(&DictionarySource::from_text("x", "table_name,column_name\nperson,person_id\n"));
        assert!(matches!(result, Err(CodebookError::UnsupportedFormat(_))));
    }
}
