//! Clinical flavour detection and the parser fallback chain.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::fhir::{FhirParser, is_fhir_document};
use super::omop::{OMOP_REQUIRED_HEADERS, OmopParser};
use super::redcap::{REDCAP_MARKERS, RedcapParser};
use crate::error::{CodebookError, Result};
use crate::input::FormatDetector;
use crate::parse::{DictionaryParser, DictionarySource, ParserConfig, parser_for};
use crate::schema::{DataDictionary, SourceFormat};

/// Clinical dictionary flavour recognized from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClinicalFlavor {
    Redcap,
    Omop,
    Fhir,
    Generic,
}

impl fmt::Display for ClinicalFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClinicalFlavor::Redcap => "redcap",
            ClinicalFlavor::Omop => "omop",
            ClinicalFlavor::Fhir => "fhir",
            ClinicalFlavor::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// Parsed dictionary plus how it was obtained.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub dictionary: DataDictionary,
    /// Container format of the source document.
    pub format: SourceFormat,
    /// Flavour detected before parsing.
    pub flavor: ClinicalFlavor,
    /// Name of the parser that succeeded.
    pub parser: &'static str,
}

/// Routes a dictionary document through an ordered list of parser attempts.
///
/// The flavour-specific parser (if any) runs first, then the generic parser
/// for the container format. The first success wins.
pub struct ClinicalFormatIntegrator {
    config: ParserConfig,
    detector: FormatDetector,
}

impl ClinicalFormatIntegrator {
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            detector: FormatDetector::new(),
        }
    }

    /// Read, detect and parse a dictionary file.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<ParseOutcome> {
        let path = path.as_ref();
        let format = self
            .config
            .format
            .unwrap_or_else(|| self.detector.detect_path(path));
        let source = DictionarySource::from_path(path)?;
        self.parse_source(&source, format)
    }

    /// Parse an already loaded document of a known container format.
    pub fn parse_source(&self, source: &DictionarySource, format: SourceFormat) -> Result<ParseOutcome> {
        let flavor = if self.config.clinical_formats {
            self.detect_flavor(source, format)
        } else {
            ClinicalFlavor::Generic
        };
        debug!(name = %source.name, %format, %flavor, "dictionary flavour detected");

        let mut last_error = None;
        for parser in attempts(flavor, format) {
            match parser.parse(source) {
                Ok(dictionary) => {
                    info!(
                        name = %dictionary.name,
                        parser = parser.name(),
                        fields = dictionary.len(),
                        "parsed dictionary"
                    );
                    return Ok(ParseOutcome {
                        dictionary,
                        format,
                        flavor,
                        parser: parser.name(),
                    });
                }
                Err(e) => {
                    warn!(parser = parser.name(), error = %e, "dictionary parser failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            CodebookError::UnsupportedFormat(format!("no parser available for {}", format))
        }))
    }

    /// Recognize REDCap, OMOP and FHIR content inside a container format.
    pub fn detect_flavor(&self, source: &DictionarySource, format: SourceFormat) -> ClinicalFlavor {
        match format {
            SourceFormat::Json => match serde_json::from_str(&source.content) {
                Ok(document) if is_fhir_document(&document) => ClinicalFlavor::Fhir,
                _ => ClinicalFlavor::Generic,
            },
            SourceFormat::Csv => {
                let mut reader = csv::ReaderBuilder::new()
                    .has_headers(true)
                    .flexible(true)
                    .from_reader(source.content.as_bytes());
                let Ok(headers) = reader.headers() else {
                    return ClinicalFlavor::Generic;
                };
                let headers: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
                let joined = headers.join(" ");

                if REDCAP_MARKERS.iter().any(|marker| joined.contains(marker)) {
                    ClinicalFlavor::Redcap
                } else if OMOP_REQUIRED_HEADERS
                    .iter()
                    .all(|required| headers.iter().any(|h| h == required))
                {
                    ClinicalFlavor::Omop
                } else {
                    ClinicalFlavor::Generic
                }
            }
            SourceFormat::Yaml | SourceFormat::Xml => ClinicalFlavor::Generic,
        }
    }
}

impl Default for ClinicalFormatIntegrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered parser attempts for a flavour within a container format.
fn attempts(flavor: ClinicalFlavor, format: SourceFormat) -> Vec<Box<dyn DictionaryParser>> {
    let mut chain: Vec<Box<dyn DictionaryParser>> = Vec::new();
    match flavor {
        ClinicalFlavor::Redcap => chain.push(Box::new(RedcapParser)),
        ClinicalFlavor::Omop => chain.push(Box::new(OmopParser)),
        ClinicalFlavor::Fhir => chain.push(Box::new(FhirParser)),
        ClinicalFlavor::Generic => {}
    }
    chain.push(parser_for(format));
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_flavors() {
        let integrator = ClinicalFormatIntegrator::new();
        let redcap = DictionarySource::from_text("r", "Variable / Field Name,Field Type,Field Label\nage,text,Age\n");
        let omop = DictionarySource::from_text("o", "table_name,column_name,data_type\nperson,person_id,bigint\n");
        let fhir = DictionarySource::from_text("f", r#"{"resourceType": "Bundle", "entry": []}"#);
        let plain = DictionarySource::from_text("p", "field_name,type\nage,integer\n");

        assert_eq!(integrator.detect_flavor(&redcap, SourceFormat::Csv), ClinicalFlavor::Redcap);
        assert_eq!(integrator.detect_flavor(&omop, SourceFormat::Csv), ClinicalFlavor::Omop);
        assert_eq!(integrator.detect_flavor(&fhir, SourceFormat::Json), ClinicalFlavor::Fhir);
        assert_eq!(integrator.detect_flavor(&plain, SourceFormat::Csv), ClinicalFlavor::Generic);
        assert_eq!(integrator.detect_flavor(&fhir, SourceFormat::Yaml), ClinicalFlavor::Generic);
    }

    #[test]
    fn test_attempt_order() {
        let names: Vec<_> = attempts(ClinicalFlavor::Omop, SourceFormat::Csv)
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["omop", "csv"]);
        assert_eq!(attempts(ClinicalFlavor::Generic, SourceFormat::Xml).len(), 1);
    }

    #[test]
    fn test_clinical_formats_can_be_disabled() {
        let integrator = ClinicalFormatIntegrator::with_config(ParserConfig::default().with_clinical_formats(false));
        let source = DictionarySource::from_text(
            "r",
            "Variable / Field Name,Field Type,Field Label\nage,text,Age\n",
        );
        let outcome = integrator.parse_source(&source, SourceFormat::Csv).unwrap();
        assert_eq!(outcome.flavor, ClinicalFlavor::Generic);
        assert_eq!(outcome.parser, "csv");
    }

    #[test]
    fn test_last_error_is_returned() {
        let integrator = ClinicalFormatIntegrator::new();
        let source = DictionarySource::from_text("bad", "{\"resourceType\": \"Bundle\", \"entry\": [");
        let result = integrator.parse_source(&source, SourceFormat::Json);
        assert!(matches!(result, Err(CodebookError::Json(_))));
    }
}
