//! Generic CSV dictionary reader (REDCap-style headers and common aliases).

use tracing::debug;

use super::{DictionaryParser, DictionarySource, is_required_flag, parse_choices};
use crate::error::{CodebookError, Result};
use crate::schema::{DataDictionary, FieldDescriptor, FieldType, SourceFormat, ValidationRules};

/// Dictionary attributes a CSV column can supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attribute {
    Name,
    Label,
    Type,
    Choices,
    Note,
    Validation,
    Min,
    Max,
    Required,
    BranchingLogic,
    Section,
    Units,
}

/// Header spellings recognized for each attribute, compared case-insensitively.
const HEADER_SYNONYMS: &[(Attribute, &[&str])] = &[
    (
        Attribute::Name,
        &["Variable / Field Name", "field_name", "variable_name", "name", "field", "variable"],
    ),
    (Attribute::Label, &["Field Label", "field_label", "label", "description"]),
    (Attribute::Type, &["Field Type", "field_type", "type", "data_type"]),
    (
        Attribute::Choices,
        &["Choices, Calculations, OR Slider Labels", "choices", "values", "options"],
    ),
    (Attribute::Note, &["Field Note", "field_note", "note", "help_text"]),
    (
        Attribute::Validation,
        &["Text Validation Type OR Show Slider Number", "validation", "validation_type"],
    ),
    (Attribute::Min, &["Text Validation Min", "validation_min", "min_value", "minimum", "min"]),
    (Attribute::Max, &["Text Validation Max", "validation_max", "max_value", "maximum", "max"]),
    (Attribute::Required, &["Required Field?", "required", "mandatory"]),
    (
        Attribute::BranchingLogic,
        &["Branching Logic (Show field only if...)", "branching_logic", "logic"],
    ),
    (Attribute::Section, &["Section Header", "section", "category", "form"]),
    (Attribute::Units, &["units", "unit"]),
];

/// Resolved positions of recognized columns.
#[derive(Debug, Default)]
struct ColumnMap {
    columns: Vec<(Attribute, usize)>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Self {
        let mut columns = Vec::new();
        for (attribute, synonyms) in HEADER_SYNONYMS {
            let found = headers.iter().position(|header| {
                let header = header.trim();
                synonyms.iter().any(|s| s.eq_ignore_ascii_case(header))
            });
            if let Some(index) = found {
                columns.push((*attribute, index));
            }
        }
        Self { columns }
    }

    fn index(&self, attribute: Attribute) -> Option<usize> {
        self.columns
            .iter()
            .find(|(a, _)| *a == attribute)
            .map(|(_, index)| *index)
    }

    /// Trimmed, non-empty cell for an attribute.
    fn cell<'r>(&self, record: &'r csv::StringRecord, attribute: Attribute) -> Option<&'r str> {
        let value = record.get(self.index(attribute)?)?.trim();
        (!value.is_empty()).then_some(value)
    }
}

/// Parses CSV data dictionaries such as REDCap exports or hand-written sheets.
pub struct CsvDictionaryParser;

impl DictionaryParser for CsvDictionaryParser {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn parse(&self, source: &DictionarySource) -> Result<DataDictionary> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(source.content.as_bytes());

        let headers = reader.headers()?.clone();
        let columns = ColumnMap::resolve(&headers);
        debug!(recognized = columns.columns.len(), "resolved dictionary columns");

        if columns.index(Attribute::Name).is_none() {
            return Err(CodebookError::UnsupportedFormat(format!(
                "no field name column among headers: {}",
                headers.iter().collect::<Vec<_>>().join(", ")
            )));
        }

        let mut dictionary = DataDictionary::new(&source.name, SourceFormat::Csv);

        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            // Line number in the file, header included.
            let row = idx + 2;

            let Some(name) = columns.cell(&record, Attribute::Name) else {
                continue;
            };

            let field = build_field(name, &record, &columns, row)?;
            dictionary.add_field(field);
        }

        Ok(dictionary)
    }
}

fn build_field(
    name: &str,
    record: &csv::StringRecord,
    columns: &ColumnMap,
    row: usize,
) -> Result<FieldDescriptor> {
    let mut field = FieldDescriptor::new(name, FieldType::Unknown);

    if let Some(label) = columns.cell(record, Attribute::Label) {
        field.label = label.to_string();
    }
    if let Some(note) = columns.cell(record, Attribute::Note) {
        field.description = note.to_string();
        field.field_note = Some(note.to_string());
    }
    if let Some(type_name) = columns.cell(record, Attribute::Type) {
        field.field_type = FieldType::from_source_name(type_name);
    }
    if let Some(choices) = columns.cell(record, Attribute::Choices) {
        field.choices = parse_choices(choices);
    }
    if let Some(required) = columns.cell(record, Attribute::Required) {
        field.required = is_required_flag(required);
    }
    field.section = columns.cell(record, Attribute::Section).map(str::to_string);
    field.branching_logic = columns.cell(record, Attribute::BranchingLogic).map(str::to_string);
    field.units = columns.cell(record, Attribute::Units).map(str::to_string);

    let mut rules = ValidationRules::new();
    if let Some(validation) = columns.cell(record, Attribute::Validation) {
        rules = rules.with_validation_type(validation);
    }
    let min = parse_bound(record, columns, Attribute::Min, row)?;
    let max = parse_bound(record, columns, Attribute::Max, row)?;
    field.validation_rules = rules.with_range(min, max);

    Ok(field.finalize())
}

fn parse_bound(
    record: &csv::StringRecord,
    columns: &ColumnMap,
    attribute: Attribute,
    row: usize,
) -> Result<Option<f64>> {
    let Some(raw) = columns.cell(record, attribute) else {
        return Ok(None);
    };
    let column = columns.index(attribute).map(|i| i + 1).unwrap_or(0);

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(CodebookError::parse_at(
            row,
            column,
            format!("non-numeric validation bound '{}'", raw),
        )),
    }
}
