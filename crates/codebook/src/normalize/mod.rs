//! Dataset normalization, validation issues and quality scoring.
//!
//! [`DataNormalizer`] rewrites each column according to its dictionary
//! descriptor and collects [`ValidationIssue`]s; [`QualityScorer`] turns the
//! result into a [`DataQualityReport`].

mod infer;
mod issue;
mod normalizer;
mod quality;

pub use infer::{distinct_values, infer_type, parse_date, parse_datetime, parse_number};
pub use issue::{IssueCollector, Severity, ValidationIssue};
pub use normalizer::{
    BinaryNormalizer, BooleanNormalizer, CategoricalNormalizer, ColumnType, DataNormalizer, EmailNormalizer,
    NormalizedDataset, NormalizerConfig, NumericNormalizer, PhoneNormalizer, TemporalNormalizer, TextNormalizer,
    ValueNormalizer,
};
pub use quality::{
    CategoricalSummary, DataQualityReport, FieldStatistics, NumericSummary, QualityScorer, TextSummary,
};
