//! Statistical detection of what ambiguous binary columns encode.

mod detector;
mod stats;

pub use detector::{
    anchor_kind, is_ambiguous_name, AnchorKind, DetectionEvidence, DetectorConfig, FieldDetectionResult, GroupTest,
    SemanticType, StatisticalFieldDetector,
};
pub use stats::{mean, pearson, sample_variance, student_t_two_sided, welch_t_test, WelchTest};
