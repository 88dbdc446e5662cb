//! Fuzzy matching of dictionary fields onto canonical archetypes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::archetype::{ARCHETYPES, Archetype};
use crate::schema::{DataDictionary, FieldDescriptor};

/// Minimum score a candidate must exceed to be kept.
const MIN_SCORE: f64 = 0.3;
/// Candidates kept per archetype.
const MAX_CANDIDATES: usize = 3;

const EXACT_WEIGHT: f64 = 0.9;
const SUBSTRING_WEIGHT: f64 = 0.6;
const TEXT_WEIGHT: f64 = 0.3;
const TYPE_WEIGHT: f64 = 0.3;
const PLAUSIBILITY_WEIGHT: f64 = 0.2;

/// A dictionary field proposed for an archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub field_name: String,
    pub score: f64,
}

/// Archetype name → candidates ranked by descending score.
pub type ArchetypeMapping = IndexMap<String, Vec<FieldMatch>>;

/// Maps dictionary fields onto the fixed archetype table.
pub struct CanonicalFieldMapper {
    archetypes: &'static [Archetype],
}

impl CanonicalFieldMapper {
    pub fn new() -> Self {
        Self { archetypes: ARCHETYPES }
    }

    /// Rank candidate fields for every archetype.
    ///
    /// Archetypes with no candidate above the threshold still appear with an
    /// empty list. Equal scores keep dictionary order.
    pub fn map_fields(&self, dictionary: &DataDictionary) -> ArchetypeMapping {
        let mut mapping = IndexMap::new();

        for archetype in self.archetypes {
            let mut candidates: Vec<FieldMatch> = dictionary
                .fields
                .values()
                .map(|field| FieldMatch {
                    field_name: field.name.clone(),
                    score: self.score(archetype, field),
                })
                .filter(|m| m.score > MIN_SCORE)
                .collect();

            // Stable sort keeps dictionary order among ties.
            candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
            candidates.truncate(MAX_CANDIDATES);

            if !candidates.is_empty() {
                debug!(
                    archetype = archetype.name,
                    top = %candidates[0].field_name,
                    score = candidates[0].score,
                    "archetype candidates"
                );
            }
            mapping.insert(archetype.name.to_string(), candidates);
        }

        mapping
    }

    /// Top candidate per archetype, omitting archetypes without one.
    pub fn best_match(&self, dictionary: &DataDictionary) -> IndexMap<String, FieldMatch> {
        self.map_fields(dictionary)
            .into_iter()
            .filter_map(|(archetype, candidates)| candidates.into_iter().next().map(|best| (archetype, best)))
            .collect()
    }

    /// Match score of one field against one archetype, capped at 1.0.
    pub fn score(&self, archetype: &Archetype, field: &FieldDescriptor) -> f64 {
        let name = field.name.to_lowercase();
        let mut score = 0.0;

        if archetype.synonyms.iter().any(|s| *s == name) {
            score += EXACT_WEIGHT;
        }
        if archetype
            .synonyms
            .iter()
            .any(|s| name.contains(s) || s.contains(name.as_str()))
        {
            score += SUBSTRING_WEIGHT;
        }

        let text = format!("{} {}", field.label, field.description).to_lowercase();
        if archetype.synonyms.iter().any(|s| text.contains(s)) {
            score += TEXT_WEIGHT;
        }

        if archetype.expected_types.contains(&field.field_type) {
            score += TYPE_WEIGHT;
        }
        if archetype.plausibility.check(field) {
            score += PLAUSIBILITY_WEIGHT;
        }

        f64::min(score, 1.0)
    }
}

impl Default for CanonicalFieldMapper {
    fn default() -> Self {
        Self::new()
    }
}
