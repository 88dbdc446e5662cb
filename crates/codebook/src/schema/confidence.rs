//! Completeness/confidence scoring for field descriptors.

use super::field::FieldDescriptor;
use super::types::FieldType;

const NAME_WEIGHT: f64 = 0.20;
const LABEL_WEIGHT: f64 = 0.20;
const DESCRIPTION_WEIGHT: f64 = 0.15;
const TYPE_WEIGHT: f64 = 0.20;
const CHOICES_WEIGHT: f64 = 0.15;
const RULES_WEIGHT: f64 = 0.10;

/// Score how completely a descriptor is specified.
///
/// Additive over the populated attributes and capped at 1.0. The result
/// depends only on the descriptor's content (the stored score is ignored),
/// so re-scoring is idempotent.
pub fn score(field: &FieldDescriptor) -> f64 {
    let mut score = 0.0;

    if !field.name.trim().is_empty() {
        score += NAME_WEIGHT;
    }
    if !field.label.trim().is_empty() && field.label != field.name {
        score += LABEL_WEIGHT;
    }
    if !field.description.trim().is_empty() {
        score += DESCRIPTION_WEIGHT;
    }
    if field.field_type != FieldType::Unknown {
        score += TYPE_WEIGHT;
    }
    if !field.choices.is_empty() {
        score += CHOICES_WEIGHT;
    }
    if !field.validation_rules.is_empty() {
        score += RULES_WEIGHT;
    }

    // Four decimals keep the stored score stable across JSON round trips.
    (f64::min(score, 1.0) * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Choice, ValidationRules};

    #[test]
    fn test_name_only() {
        let field = FieldDescriptor::new("x", FieldType::Unknown);
        assert!((score(&field) - 0.20).abs() < 1e-9);
    }

    #[test]
    fn test_fully_specified_caps_at_one() {
        let field = FieldDescriptor::new("sex", FieldType::Categorical)
            .with_label("Biological sex")
            .with_description("Sex at birth")
            .with_choices(vec![Choice::new("1", "Male")])
            .with_rules(ValidationRules::new().with_unique(false).with_regex("^[12]$"));
        assert!((score(&field) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_ignores_stored_value() {
        let mut field = FieldDescriptor::new("age", FieldType::Integer).with_label("Age");
        let first = score(&field);
        field.confidence_score = 0.99;
        assert_eq!(score(&field), first);
        assert!((first - 0.60).abs() < 1e-9);
    }
}
