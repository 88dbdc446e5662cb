//! REDCap data dictionary export reader.

use indexmap::IndexSet;
use serde_json::Value;
use tracing::debug;

use crate::error::{CodebookError, Result};
use crate::parse::{DictionaryParser, DictionarySource, is_required_flag};
use crate::schema::{Choice, DataDictionary, FieldDescriptor, FieldType, SourceFormat, ValidationRules};

const FIELD_NAME: &str = "Variable / Field Name";
const FORM_NAME: &str = "Form Name";
const SECTION: &str = "Section Header";
const FIELD_TYPE: &str = "Field Type";
const FIELD_LABEL: &str = "Field Label";
const CHOICES: &str = "Choices, Calculations, OR Slider Labels";
const FIELD_NOTE: &str = "Field Note";
const VALIDATION: &str = "Text Validation Type OR Show Slider Number";
const VALIDATION_MIN: &str = "Text Validation Min";
const VALIDATION_MAX: &str = "Text Validation Max";
const IDENTIFIER: &str = "Identifier?";
const BRANCHING_LOGIC: &str = "Branching Logic (Show field only if...)";
const REQUIRED: &str = "Required Field?";
const MATRIX_GROUP: &str = "Matrix Group Name";

/// Header names that identify a REDCap export.
pub(crate) const REDCAP_MARKERS: &[&str] = &["variable / field name", "field type", "field label"];

/// Parses the CSV data dictionary REDCap exports for a project.
pub struct RedcapParser;

impl DictionaryParser for RedcapParser {
    fn name(&self) -> &'static str {
        "redcap"
    }

    fn parse(&self, source: &DictionarySource) -> Result<DataDictionary> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(source.content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

        let name_idx = column(FIELD_NAME).ok_or_else(|| {
            CodebookError::UnsupportedFormat(format!("REDCap export lacks a '{}' column", FIELD_NAME))
        })?;
        let type_idx = column(FIELD_TYPE);

        let mut dictionary = DataDictionary::new(&source.name, SourceFormat::Csv);
        let mut forms: IndexSet<String> = IndexSet::new();

        for result in reader.records() {
            let record = result?;
            let cell = |idx: Option<usize>| {
                idx.and_then(|i| record.get(i))
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
            };

            let Some(name) = cell(Some(name_idx)) else {
                continue;
            };
            let redcap_type = cell(type_idx).unwrap_or("text").to_lowercase();
            if redcap_type == "descriptive" {
                debug!(field = name, "skipping descriptive REDCap field");
                continue;
            }

            let validation = cell(column(VALIDATION));
            let identifier = cell(column(IDENTIFIER)).is_some_and(is_required_flag);
            let form = cell(column(FORM_NAME));
            if let Some(form) = form {
                forms.insert(form.to_string());
            }

            let mut field_type = map_field_type(&redcap_type, validation);
            if identifier && redcap_type == "text" {
                field_type = FieldType::Identifier;
            }

            let mut field = FieldDescriptor::new(name, field_type);
            if let Some(label) = cell(column(FIELD_LABEL)) {
                field.label = label.to_string();
            }
            if let Some(note) = cell(column(FIELD_NOTE)) {
                field.description = note.to_string();
                field.field_note = Some(note.to_string());
            }
            field.required = cell(column(REQUIRED)).is_some_and(is_required_flag);
            field.section = cell(column(SECTION)).map(str::to_string);
            field.branching_logic = cell(column(BRANCHING_LOGIC)).map(str::to_string);

            if matches!(redcap_type.as_str(), "dropdown" | "radio" | "checkbox") {
                if let Some(choices) = cell(column(CHOICES)) {
                    field.choices = parse_redcap_choices(choices);
                }
            }

            field.validation_rules = parse_validation(
                validation,
                cell(column(VALIDATION_MIN)),
                cell(column(VALIDATION_MAX)),
            );

            field.metadata.insert("redcap_type".into(), Value::from(redcap_type.clone()));
            if let Some(form) = form {
                field.metadata.insert("form_name".into(), Value::from(form));
            }
            if identifier {
                field.metadata.insert("identifier".into(), Value::Bool(true));
            }
            if let Some(group) = cell(column(MATRIX_GROUP)) {
                field.metadata.insert("matrix_group".into(), Value::from(group));
            }

            dictionary.add_field(field.finalize());
        }

        dictionary.metadata.insert("source_type".into(), Value::from("redcap"));
        dictionary.metadata.insert(
            "forms".into(),
            Value::Array(forms.into_iter().map(Value::String).collect()),
        );

        Ok(dictionary)
    }
}

/// Map a REDCap field type, refining `text` by its validation type.
fn map_field_type(redcap_type: &str, validation: Option<&str>) -> FieldType {
    match redcap_type {
        "text" => validation.map(map_text_validation).unwrap_or(FieldType::Text),
        "notes" | "file" => FieldType::Text,
        "dropdown" | "radio" | "checkbox" | "sql" => FieldType::Categorical,
        "yesno" | "truefalse" => FieldType::Boolean,
        "slider" => FieldType::Integer,
        "calc" => FieldType::Decimal,
        _ => FieldType::Unknown,
    }
}

fn map_text_validation(validation: &str) -> FieldType {
    let validation = validation.to_lowercase();
    match validation.as_str() {
        "email" => FieldType::Email,
        "phone" | "phone_australia" => FieldType::Phone,
        "integer" => FieldType::Integer,
        "number" | "float" => FieldType::Decimal,
        v if v.starts_with("number_") => FieldType::Decimal,
        v if v.starts_with("datetime_") => FieldType::DateTime,
        v if v.starts_with("date_") => FieldType::Date,
        _ => FieldType::Text,
    }
}

/// REDCap choices are always `code, label` segments separated by `|`.
fn parse_redcap_choices(raw: &str) -> Vec<Choice> {
    raw.split('|')
        .filter_map(|segment| {
            let (value, label) = segment.trim().split_once(',')?;
            Some(Choice::new(value.trim(), label.trim()))
        })
        .filter(|choice| !choice.value.is_empty())
        .collect()
}

/// Numeric bounds become a range rule; others (dates, `today`) are kept verbatim.
fn parse_validation(validation: Option<&str>, min: Option<&str>, max: Option<&str>) -> ValidationRules {
    let mut rules = ValidationRules::new();
    if let Some(validation) = validation {
        rules = rules.with_validation_type(validation);
    }

    let numeric = |raw: Option<&str>| raw.and_then(|v| v.parse::<f64>().ok()).filter(|v| v.is_finite());
    for (key, raw) in [("min", min), ("max", max)] {
        if let Some(raw) = raw {
            if numeric(Some(raw)).is_none() {
                rules.keep_extra(key, Value::from(raw));
            }
        }
    }

    rules.with_range(numeric(min), numeric(max))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
Variable / Field Name,Form Name,Section Header,Field Type,Field Label,\"Choices, Calculations, OR Slider Labels\",Field Note,Text Validation Type OR Show Slider Number,Text Validation Min,Text Validation Max,Identifier?,Branching Logic (Show field only if...),Required Field?
record_id,demographics,,text,Record ID,,,,,,y,,y
dob,demographics,,text,Date of birth,,,date_ymd,1900-01-01,today,y,,
age,demographics,,text,Age,,years,integer,0,120,,,
sex,demographics,,radio,Sex,\"1, Male | 2, Female\",,,,,,,y
intro,demographics,Welcome,descriptive,Please answer,,,,,,,,
email,contact,,text,Email,,,email,,,,,
consent,contact,,yesno,Consent given?,,,,,,,[age] >= 18,
bmi,vitals,,calc,BMI,\"[weight]/([height]/100)^2\",,,,,,,
";

    fn parse() -> DataDictionary {
        RedcapParser
            .parse(&DictionarySource::from_text("project", EXPORT))
            .unwrap()
    }

    #[test]
    fn test_types_and_validation() {
        let dict = parse();
        assert_eq!(dict.len(), 7);
        assert!(dict.get_field("intro").is_none());

        assert_eq!(dict.get_field("record_id").unwrap().field_type, FieldType::Identifier);
        assert_eq!(dict.get_field("dob").unwrap().field_type, FieldType::Date);
        assert_eq!(dict.get_field("email").unwrap().field_type, FieldType::Email);
        assert_eq!(dict.get_field("consent").unwrap().field_type, FieldType::Boolean);
        assert_eq!(dict.get_field("bmi").unwrap().field_type, FieldType::Decimal);
        assert!(dict.get_field("bmi").unwrap().choices.is_empty());

        let age = dict.get_field("age").unwrap();
        assert_eq!(age.field_type, FieldType::Integer);
        assert_eq!(age.units, None);
        assert_eq!(age.description, "years");
        let range = age.validation_rules.range.unwrap();
        assert_eq!((range.min, range.max), (Some(0.0), Some(120.0)));

        let dob = dict.get_field("dob").unwrap();
        assert!(dob.validation_rules.range.is_none());
        assert_eq!(dob.validation_rules.extra.get("max"), Some(&Value::from("today")));
    }

    #[test]
    fn test_choices_forms_and_metadata() {
        let dict = parse();
        let sex = dict.get_field("sex").unwrap();
        assert!(sex.required);
        assert_eq!(sex.choices, vec![Choice::new("1", "Male"), Choice::new("2", "Female")]);
        assert_eq!(sex.metadata.get("redcap_type"), Some(&Value::from("radio")));
        assert_eq!(sex.metadata.get("form_name"), Some(&Value::from("demographics")));

        assert_eq!(
            dict.metadata.get("forms"),
            Some(&serde_json::json!(["demographics", "contact", "vitals"]))
        );
        assert_eq!(
            dict.get_field("consent").unwrap().branching_logic.as_deref(),
            Some("[age] >= 18")
        );
    }

    #[test]
    fn test_rejects_non_redcap_headers() {
        let result = RedcapParser.parse(&DictionarySource::from_text("x", "field_name,type\nage,int\n"));
        assert!(matches!(result, Err(CodebookError::UnsupportedFormat(_))));
    }
}
