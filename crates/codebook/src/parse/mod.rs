//! Dictionary parsers, one per container format.
//!
//! Every parser turns a [`DictionarySource`] into a [`DataDictionary`].
//! Descriptors are finalized (label default, categorical upgrade,
//! confidence score) as they are produced.

mod json;
mod tabular;
mod xml;
mod yaml;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{CodebookError, Result};
use crate::input::FormatDetector;
use crate::schema::{Choice, DataDictionary, SourceFormat};

pub use self::json::JsonDictionaryParser;
pub use self::tabular::CsvDictionaryParser;
pub use self::xml::XmlDictionaryParser;
pub use self::yaml::YamlDictionaryParser;

pub(crate) use self::json::{build_dictionary_from_value, parse_rules_value};

/// Raw dictionary document plus the name it should carry.
#[derive(Debug, Clone)]
pub struct DictionarySource {
    /// Dictionary name, usually the file stem.
    pub name: String,
    /// Originating file, if any.
    pub path: Option<PathBuf>,
    /// Full document text.
    pub content: String,
}

impl DictionarySource {
    /// Read a dictionary document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| CodebookError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            name,
            path: Some(path.to_path_buf()),
            content,
        })
    }

    /// Wrap an in-memory document.
    pub fn from_text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            content: content.into(),
        }
    }

    /// Extension of the originating file, lowercased.
    pub fn extension(&self) -> Option<String> {
        self.path
            .as_ref()?
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
    }
}

/// A format-specific dictionary reader.
pub trait DictionaryParser {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Parse the document into a dictionary.
    fn parse(&self, source: &DictionarySource) -> Result<DataDictionary>;
}

/// Dictionary parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Force a container format instead of detecting it.
    pub format: Option<SourceFormat>,
    /// Try REDCap/OMOP/FHIR readers before the generic ones.
    pub clinical_formats: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            format: None,
            clinical_formats: true,
        }
    }
}

impl ParserConfig {
    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_clinical_formats(mut self, enabled: bool) -> Self {
        self.clinical_formats = enabled;
        self
    }
}

/// The generic parser for a container format.
pub fn parser_for(format: SourceFormat) -> Box<dyn DictionaryParser> {
    match format {
        SourceFormat::Csv => Box::new(CsvDictionaryParser),
        SourceFormat::Json => Box::new(JsonDictionaryParser),
        SourceFormat::Yaml => Box::new(YamlDictionaryParser),
        SourceFormat::Xml => Box::new(XmlDictionaryParser),
    }
}

/// Detect the format of a file and parse it with the generic parser.
pub fn parse_dictionary(path: impl AsRef<Path>, format: Option<SourceFormat>) -> Result<DataDictionary> {
    let path = path.as_ref();
    let format = format.unwrap_or_else(|| FormatDetector::new().detect_path(path));
    let source = DictionarySource::from_path(path)?;
    let parser = parser_for(format);

    info!(file = %path.display(), parser = parser.name(), "parsing dictionary");
    let dictionary = parser.parse(&source)?;
    info!(fields = dictionary.len(), "parsed dictionary");

    Ok(dictionary)
}

/// Parse a choices cell such as `1, Male | 2, Female` or `1=Yes|0=No`.
///
/// Segments are split on `|` when present, otherwise on `,`. Each segment
/// is `value=label`, `value,label`, or a bare token used as both.
pub fn parse_choices(raw: &str) -> Vec<Choice> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let parts: Vec<&str> = if raw.contains('|') {
        raw.split('|').collect()
    } else {
        raw.split(',').collect()
    };

    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            if let Some((value, label)) = part.split_once('=') {
                Choice::new(value.trim(), label.trim())
            } else if part.matches(',').count() == 1 {
                let (value, label) = part.split_once(',').unwrap_or((part, part));
                Choice::new(value.trim(), label.trim())
            } else {
                Choice::bare(part)
            }
        })
        .collect()
}

/// Truthy spellings of a "required" cell.
pub fn is_required_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "y" | "yes" | "1" | "true" | "required"
    )
}
