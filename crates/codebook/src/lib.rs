//! Codebook: clinical data dictionary ingestion and dataset normalization.
//!
//! Codebook reads data dictionaries in many shapes (CSV, JSON, YAML, XML,
//! REDCap exports, OMOP CDM specifications, FHIR bundles) into a single
//! canonical [`DataDictionary`], then uses it to normalize and validate raw
//! tabular data.
//!
//! # Pipeline
//!
//! - **Parse**: dictionary file → [`DataDictionary`] with a confidence score per field
//! - **Map**: fields → canonical clinical archetypes (age, sex, visit date...)
//! - **Normalize**: dataset + dictionary → normalized cells and [`ValidationIssue`]s
//! - **Score**: completeness, consistency and validity of the result
//! - **Detect**: semantic type of cryptic binary columns from their statistics
//!
//! # Example
//!
//! ```no_run
//! use codebook::Codebook;
//!
//! let codebook = Codebook::new();
//! let result = codebook.analyze("dictionary.csv", "visits.csv").unwrap();
//!
//! println!("Fields: {}", result.dictionary.len());
//! println!("Quality: {:.2}", result.report.overall_score);
//! ```

pub mod clinical;
pub mod detection;
pub mod error;
pub mod input;
pub mod mapping;
pub mod normalize;
pub mod parse;
pub mod schema;

mod pipeline;

pub use crate::pipeline::{AnalysisResult, AnalysisSummary, Codebook, CodebookConfig, DictionaryInspection, IssueCounts};
pub use clinical::{ClinicalFlavor, ClinicalFormatIntegrator, ParseOutcome};
pub use detection::{FieldDetectionResult, SemanticType, StatisticalFieldDetector};
pub use error::{CodebookError, Result};
pub use input::{DataTable, DatasetReader, SourceMetadata};
pub use mapping::CanonicalFieldMapper;
pub use normalize::{DataNormalizer, DataQualityReport, QualityScorer, Severity, ValidationIssue};
pub use parse::{parse_dictionary, DictionaryParser, ParserConfig};
pub use schema::{Choice, DataDictionary, FieldDescriptor, FieldType, SourceFormat, ValidationRules};
