//! Integration tests for codebook.

use std::io::Write;
use tempfile::NamedTempFile;

use codebook::input::FormatDetector;
use codebook::normalize::ColumnType;
use codebook::{
    Choice, ClinicalFlavor, Codebook, CodebookConfig, CodebookError, DataDictionary, DataNormalizer, DatasetReader,
    FieldDescriptor, FieldType, ParserConfig, Severity, SourceFormat, parse_dictionary,
};

/// Helper to create a temporary file with the given suffix and content.
fn create_test_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

// =============================================================================
// Dictionary Parsing Tests
// =============================================================================

#[test]
fn test_csv_dictionary_attributes() {
    let content = "field_name,field_type,required,min_value,max_value,choices\n\
                   patient_id,text,yes,,,\n\
                   age,integer,no,18,90,\n\
                   sex,categorical,no,,,\"1,Male|2,Female\"\n";
    let file = create_test_file(".csv", content);

    let dict = parse_dictionary(file.path(), None).expect("Parse failed");
    assert_eq!(dict.len(), 3);

    let patient = dict.get_field("patient_id").unwrap();
    assert_eq!(patient.field_type, FieldType::Text);
    assert!(patient.required);

    let age = dict.get_field("age").unwrap();
    assert_eq!(age.field_type, FieldType::Integer);
    assert!(!age.required);
    let range = age.validation_rules.range.unwrap();
    assert_eq!((range.min, range.max), (Some(18.0), Some(90.0)));

    let sex = dict.get_field("sex").unwrap();
    assert_eq!(sex.field_type, FieldType::Categorical);
    assert_eq!(sex.choices, vec![Choice::new("1", "Male"), Choice::new("2", "Female")]);
}

#[test]
fn test_json_yaml_xml_dictionaries_agree() {
    let json = r#"{"fields": [
        {"name": "age", "type": "integer", "required": true, "validation": {"min": 0, "max": 120}},
        {"name": "sex", "type": "categorical", "choices": {"1": "Male", "2": "Female"}}
    ]}"#;
    let yaml = "fields:\n  \
                - name: age\n    type: integer\n    required: true\n    validation:\n      min: 0\n      max: 120\n  \
                - name: sex\n    type: categorical\n    choices:\n      \"1\": Male\n      \"2\": Female\n";
    let xml = r#"<dictionary>
        <field name="age" type="integer" required="true"/>
        <field name="sex" type="categorical">
            <codelist>
                <item value="1"><decode>Male</decode></item>
                <item value="2"><decode>Female</decode></item>
            </codelist>
        </field>
    </dictionary>"#;

    for (suffix, content) in [(".json", json), (".yaml", yaml), (".xml", xml)] {
        let file = create_test_file(suffix, content);
        let dict = parse_dictionary(file.path(), None).unwrap_or_else(|e| panic!("{} failed: {}", suffix, e));

        assert_eq!(dict.field_names(), vec!["age", "sex"], "{}", suffix);
        let age = dict.get_field("age").unwrap();
        assert_eq!(age.field_type, FieldType::Integer, "{}", suffix);
        assert!(age.required, "{}", suffix);

        let sex = dict.get_field("sex").unwrap();
        assert_eq!(sex.field_type, FieldType::Categorical, "{}", suffix);
        assert_eq!(sex.choice_label_for("2"), Some("Female"), "{}", suffix);
    }

    // XML carries no range rules.
    for (suffix, content) in [(".json", json), (".yaml", yaml)] {
        let file = create_test_file(suffix, content);
        let dict = parse_dictionary(file.path(), None).unwrap();
        let range = dict.get_field("age").unwrap().validation_rules.range.unwrap();
        assert_eq!((range.min, range.max), (Some(0.0), Some(120.0)), "{}", suffix);
    }
}

#[test]
fn test_malformed_json_is_an_error() {
    let file = create_test_file(".json", "{\"fields\": [");
    let result = parse_dictionary(file.path(), None);
    assert!(matches!(result, Err(CodebookError::Json(_))));
}

#[test]
fn test_missing_file_is_io_error() {
    let result = parse_dictionary("/nonexistent/dictionary.csv", None);
    assert!(matches!(result, Err(CodebookError::Io { .. })));
}

#[test]
fn test_format_detection_from_content() {
    let detector = FormatDetector::new();
    assert_eq!(detector.detect_content(b"{\"fields\": {}}"), SourceFormat::Json);
    assert_eq!(detector.detect_content(b"  <dictionary/>"), SourceFormat::Xml);
    assert_eq!(detector.detect_content(b"name,type\nage,integer\n"), SourceFormat::Csv);

    // No extension: sniffed from content.
    let file = create_test_file("", "<dictionary><field name=\"age\" type=\"integer\"/></dictionary>");
    assert_eq!(detector.detect_path(file.path()), SourceFormat::Xml);
}

// =============================================================================
// Clinical Format Tests
// =============================================================================

#[test]
fn test_redcap_export_through_integrator() {
    let content = "Variable / Field Name,Form Name,Field Type,Field Label,\"Choices, Calculations, OR Slider Labels\",Text Validation Type OR Show Slider Number,Required Field?\n\
                   record_id,enrollment,text,Record ID,,,y\n\
                   visit_date,enrollment,text,Visit date,,date_ymd,\n\
                   sex,enrollment,radio,Sex,\"1, Male | 2, Female\",,y\n";
    let file = create_test_file(".csv", content);

    let inspection = Codebook::new().inspect(file.path()).expect("Inspect failed");
    assert_eq!(inspection.outcome.flavor, ClinicalFlavor::Redcap);
    assert_eq!(inspection.outcome.parser, "redcap");

    let dict = &inspection.outcome.dictionary;
    assert_eq!(dict.get_field("visit_date").unwrap().field_type, FieldType::Date);
    assert_eq!(dict.get_field("sex").unwrap().choices.len(), 2);
    assert_eq!(inspection.mapping["visit_date"][0].field_name, "visit_date");
}

#[test]
fn test_omop_spec_through_integrator() {
    let content = "table_name,column_name,data_type,is_nullable,description\n\
                   person,person_id,bigint,No,Unique person identifier\n\
                   person,year_of_birth,integer,No,Year of birth\n\
                   person,gender_concept_id,integer,No,Gender\n";
    let file = create_test_file(".csv", content);

    let inspection = Codebook::new().inspect(file.path()).expect("Inspect failed");
    assert_eq!(inspection.outcome.flavor, ClinicalFlavor::Omop);
    assert_eq!(inspection.outcome.parser, "omop");
    assert!(inspection.outcome.dictionary.get_field("year_of_birth").unwrap().required);
}

#[test]
fn test_fhir_bundle_through_integrator() {
    let content = r#"{
        "resourceType": "Bundle",
        "type": "collection",
        "entry": [
            {"resource": {"resourceType": "Patient", "id": "p1", "gender": "female", "birthDate": "1980-04-02"}}
        ]
    }"#;
    let file = create_test_file(".json", content);

    let inspection = Codebook::new().inspect(file.path()).expect("Inspect failed");
    assert_eq!(inspection.outcome.flavor, ClinicalFlavor::Fhir);
    assert_eq!(inspection.outcome.parser, "fhir");

    let dict = &inspection.outcome.dictionary;
    assert_eq!(dict.get_field("Patient.birthDate").unwrap().field_type, FieldType::Date);
    assert!(dict.get_field("Patient.id").unwrap().required);
}

#[test]
fn test_integrator_falls_back_to_generic_parser() {
    // REDCap-looking headers without the REDCap field name column.
    let content = "field_name,Field Type,Field Label\n\
                   age,integer,Age in years\n\
                   weight,decimal,Body weight\n";
    let file = create_test_file(".csv", content);

    let inspection = Codebook::new().inspect(file.path()).expect("Inspect failed");
    assert_eq!(inspection.outcome.flavor, ClinicalFlavor::Redcap);
    assert_eq!(inspection.outcome.parser, "csv");
    assert_eq!(inspection.outcome.dictionary.get_field("age").unwrap().label, "Age in years");
}

#[test]
fn test_generic_only_configuration() {
    let content = "Variable / Field Name,Field Type,Field Label\nage,text,Age\n";
    let file = create_test_file(".csv", content);

    let config = CodebookConfig::default().with_parser(ParserConfig::default().with_clinical_formats(false));
    let inspection = Codebook::with_config(config).inspect(file.path()).expect("Inspect failed");
    assert_eq!(inspection.outcome.parser, "csv");
    assert_eq!(inspection.outcome.dictionary.len(), 1);
}

// =============================================================================
// Dataset Reading Tests
// =============================================================================

#[test]
fn test_dataset_delimiter_detection() {
    let cases = [
        ("subject\tage\tsex\nS1\t34\t1\nS2\t51\t2\n", "tsv"),
        ("subject,age,sex\nS1,34,1\nS2,51,2\n", "csv"),
        ("subject;age;sex\nS1;34;1\nS2;51;2\n", "csv-semicolon"),
        ("subject|age|sex\nS1|34|1\nS2|51|2\n", "psv"),
    ];

    for (content, format) in cases {
        let file = create_test_file(".txt", content);
        let (table, source) = DatasetReader::new().read_file(file.path()).expect("Read failed");
        assert_eq!(table.headers, vec!["subject", "age", "sex"], "{:?}", content);
        assert_eq!(table.column_by_name("age").unwrap(), vec!["34", "51"]);
        assert_eq!(source.row_count, 2);
        assert_eq!(source.format, format);
        assert!(source.hash.starts_with("sha256:"));
    }
}

#[test]
fn test_ragged_rows_are_padded() {
    let file = create_test_file(".csv", "a,b,c\n1,2\n4,5,6,7\n");
    let (table, _) = DatasetReader::new().read_file(file.path()).expect("Read failed");
    assert_eq!(table.rows[0], vec!["1", "2", ""]);
    assert_eq!(table.rows[1], vec!["4", "5", "6"]);
}

// =============================================================================
// Normalization Tests
// =============================================================================

fn sex_dictionary() -> DataDictionary {
    let mut dict = DataDictionary::new("study", SourceFormat::Csv);
    dict.add_field(
        FieldDescriptor::new("sex", FieldType::Categorical)
            .with_choices(vec![Choice::new("1", "Male"), Choice::new("2", "Female")])
            .finalize(),
    );
    dict
}

#[test]
fn test_categorical_normalization() {
    let field = sex_dictionary().get_field("sex").unwrap().clone();
    let (values, issues) = DataNormalizer::new().normalize_field(&field, &["1", "Female", "m", "2"]);

    assert_eq!(values, vec!["Male", "Female", "m", "Female"]);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Warning);
    assert_eq!(issues[0].value.as_deref(), Some("m"));
    assert_eq!(issues[0].row_index, Some(2));
}

#[test]
fn test_required_missing_value_reported_once() {
    let field = FieldDescriptor::new("subject", FieldType::Text)
        .with_required(true)
        .finalize();
    let (_, issues) = DataNormalizer::new().normalize_field(&field, &["a", "b", "c", "d", ""]);

    let errors: Vec<_> = issues.iter().filter(|i| i.severity == Severity::Error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].row_index, Some(4));
}

#[test]
fn test_normalize_dataset_with_unknown_columns() {
    let dataset = create_test_file(".csv", "sex,site_code,score\n1,A,3.5\n2,B,4\nm,A,n/a\n");
    let (table, _) = DatasetReader::new().read_file(dataset.path()).expect("Read failed");

    let codebook = Codebook::new();
    let (normalized, report) = codebook.normalize(&table, &sex_dictionary());

    assert!(normalized.column_types["sex"].is_declared());
    assert_eq!(normalized.column_types["score"], ColumnType::Inferred(FieldType::Decimal));
    assert_eq!(normalized.table.column_by_name("score").unwrap(), vec!["3.5", "4", "n/a"]);

    // Unknown columns contribute warnings at most.
    assert!(report.issues_for("site_code").all(|i| i.severity <= Severity::Warning));
    assert_eq!(report.total_records, 3);
    let mean = (report.completeness_score + report.consistency_score + report.validity_score) / 3.0;
    assert!((report.overall_score - mean).abs() < 1e-9);
}

#[test]
fn test_absent_required_field_is_critical() {
    let mut dict = sex_dictionary();
    dict.add_field(
        FieldDescriptor::new("consent_date", FieldType::Date)
            .with_required(true)
            .finalize(),
    );
    let dataset = create_test_file(".csv", "sex\n1\n2\n");
    let (table, _) = DatasetReader::new().read_file(dataset.path()).expect("Read failed");

    let (_, report) = Codebook::new().normalize(&table, &dict);
    assert_eq!(report.count(Severity::Critical), 1);
    assert_eq!(report.issues_for("consent_date").count(), 1);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_dictionary_save_load() {
    let dict = sex_dictionary();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("dictionary.json");

    dict.save(&path).expect("Save failed");
    let loaded = DataDictionary::load(&path).expect("Load failed");
    assert_eq!(loaded, dict);
}

#[test]
fn test_end_to_end_outputs() {
    let dictionary = create_test_file(
        ".csv",
        "field_name,field_type,required,min_value,max_value\nage,integer,yes,0,120\nvisit,date,no,,\n",
    );
    let dataset = create_test_file(".csv", "age,visit\n34.0,2024/03/01\n,03/15/2024\n");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let result = Codebook::new()
        .analyze(dictionary.path(), dataset.path())
        .expect("Analysis failed");

    let out = dir.path().join("normalized.csv");
    let report = dir.path().join("quality.json");
    result.normalized.table.write_csv(&out).expect("Write failed");
    result.report.save(&report).expect("Save failed");

    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written, "age,visit\n34,2024-03-01\n,2024-03-15\n");

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["total_records"], 2);
    assert_eq!(json["issues"][0]["severity"], "error");
}
