//! Canonical clinical archetypes that dictionary fields are mapped onto.

use serde::{Deserialize, Serialize};

use crate::schema::{FieldDescriptor, FieldType};

/// Archetype-specific plausibility check on a field's declared constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plausibility {
    /// No check for this archetype.
    None,
    /// Declared numeric range lies inside a human age span.
    AgeRange,
    /// A choice label names a sex.
    SexChoices,
}

/// A recognized clinical concept with the names it usually goes by.
#[derive(Debug, Clone, Copy)]
pub struct Archetype {
    /// Canonical name, e.g. `age`.
    pub name: &'static str,
    /// Field-name synonyms, lowercase.
    pub synonyms: &'static [&'static str],
    /// Types a field for this concept is expected to have.
    pub expected_types: &'static [FieldType],
    pub plausibility: Plausibility,
}

/// Lower and upper bounds of a plausible age, also the defaults for missing bounds.
pub const AGE_BOUNDS: (f64, f64) = (0.0, 150.0);

/// Tokens that mark a choice label as a sex category.
pub const SEX_TOKENS: &[&str] = &["male", "female", "m", "f", "man", "woman"];

/// Fixed archetype table.
///
/// Cryptic study codes such as `s_01` (sex) and `v_02` (vital status) are not
/// synonyms; those columns are left to the statistical field detector.
pub const ARCHETYPES: &[Archetype] = &[
    Archetype {
        name: "patient_id",
        synonyms: &["patient_id", "subject_id", "participant_id", "id", "record_id", "study_id"],
        expected_types: &[FieldType::Identifier, FieldType::Text],
        plausibility: Plausibility::None,
    },
    Archetype {
        name: "age",
        synonyms: &["age", "age_years", "age_at_enrollment", "baseline_age"],
        expected_types: &[FieldType::Integer, FieldType::Decimal],
        plausibility: Plausibility::AgeRange,
    },
    Archetype {
        name: "sex",
        synonyms: &["sex", "gender", "male_female", "demographic_sex"],
        expected_types: &[FieldType::Categorical, FieldType::Binary],
        plausibility: Plausibility::SexChoices,
    },
    Archetype {
        name: "race",
        synonyms: &["race", "ethnicity", "race_ethnicity", "demographic_race"],
        expected_types: &[FieldType::Categorical],
        plausibility: Plausibility::None,
    },
    Archetype {
        name: "weight",
        synonyms: &["weight", "weight_kg", "baseline_weight", "body_weight"],
        expected_types: &[FieldType::Decimal],
        plausibility: Plausibility::None,
    },
    Archetype {
        name: "height",
        synonyms: &["height", "height_cm", "baseline_height", "body_height"],
        expected_types: &[FieldType::Decimal],
        plausibility: Plausibility::None,
    },
    Archetype {
        name: "bmi",
        synonyms: &["bmi", "body_mass_index", "baseline_bmi"],
        expected_types: &[FieldType::Decimal],
        plausibility: Plausibility::None,
    },
    Archetype {
        name: "vital_status",
        synonyms: &["vital_status", "death_status", "survival_status"],
        expected_types: &[FieldType::Binary, FieldType::Categorical],
        plausibility: Plausibility::None,
    },
    Archetype {
        name: "site_id",
        synonyms: &["site_id", "site", "center_id", "institution_id"],
        expected_types: &[FieldType::Identifier, FieldType::Categorical],
        plausibility: Plausibility::None,
    },
    Archetype {
        name: "visit_date",
        synonyms: &["visit_date", "date_visit", "assessment_date", "exam_date"],
        expected_types: &[FieldType::Date, FieldType::DateTime],
        plausibility: Plausibility::None,
    },
];

/// Look up an archetype by canonical name.
pub fn archetype(name: &str) -> Option<&'static Archetype> {
    ARCHETYPES.iter().find(|a| a.name == name)
}

impl Plausibility {
    /// Whether the field's declared constraints fit the archetype.
    pub fn check(&self, field: &FieldDescriptor) -> bool {
        match self {
            Plausibility::None => false,
            Plausibility::AgeRange => {
                let Some(range) = &field.validation_rules.range else {
                    return false;
                };
                let (lo, hi) = AGE_BOUNDS;
                let min = range.min.unwrap_or(lo);
                let max = range.max.unwrap_or(hi);
                (lo..=hi).contains(&min) && (lo..=hi).contains(&max)
            }
            Plausibility::SexChoices => field.choices.iter().any(|choice| {
                choice
                    .label
                    .to_lowercase()
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|token| SEX_TOKENS.contains(&token))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Choice, ValidationRules};

    #[test]
    fn test_table_is_complete() {
        let names: Vec<_> = ARCHETYPES.iter().map(|a| a.name).collect();
        assert_eq!(
            names,
            vec![
                "patient_id", "age", "sex", "race", "weight", "height", "bmi", "vital_status", "site_id",
                "visit_date"
            ]
        );
        assert!(ARCHETYPES.iter().all(|a| !a.synonyms.is_empty() && !a.expected_types.is_empty()));
    }

    #[test]
    fn test_age_plausibility() {
        let age = FieldDescriptor::new("age", FieldType::Integer)
            .with_rules(ValidationRules::new().with_range(Some(18.0), None));
        assert!(Plausibility::AgeRange.check(&age));

        let weird = FieldDescriptor::new("age", FieldType::Integer)
            .with_rules(ValidationRules::new().with_range(Some(0.0), Some(400.0)));
        assert!(!Plausibility::AgeRange.check(&weird));

        let no_range = FieldDescriptor::new("age", FieldType::Integer);
        assert!(!Plausibility::AgeRange.check(&no_range));
    }

    #[test]
    fn test_sex_plausibility_matches_whole_tokens() {
        let sex = FieldDescriptor::new("s", FieldType::Categorical)
            .with_choices(vec![Choice::new("1", "Male"), Choice::new("2", "Female")]);
        assert!(Plausibility::SexChoices.check(&sex));

        let arm = FieldDescriptor::new("arm", FieldType::Categorical)
            .with_choices(vec![Choice::new("A", "Treatment"), Choice::new("B", "Placebo arm")]);
        assert!(!Plausibility::SexChoices.check(&arm));
    }
}
