//! Clinical dictionary flavours: REDCap exports, OMOP CDM specifications
//! and FHIR R4 bundles.
//!
//! The [`ClinicalFormatIntegrator`] recognizes which flavour a document is
//! and falls back to the generic container parser when the specialised one
//! cannot handle it.

mod fhir;
mod integrator;
mod omop;
mod redcap;

pub use self::fhir::FhirParser;
pub use self::integrator::{ClinicalFlavor, ClinicalFormatIntegrator, ParseOutcome};
pub use self::omop::OmopParser;
pub use self::redcap::RedcapParser;

/// `gender_concept_id` → `Gender Concept Id`; camelCase words are split too.
pub(crate) fn title_case(s: &str) -> String {
    let mut spaced = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for c in s.chars() {
        if c == '_' || c == '-' {
            spaced.push(' ');
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            spaced.push(' ');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        spaced.push(c);
    }

    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("gender_concept_id"), "Gender Concept Id");
        assert_eq!(title_case("birthDate"), "Birth Date");
        assert_eq!(title_case("id"), "Id");
        assert_eq!(title_case(""), "");
    }
}
