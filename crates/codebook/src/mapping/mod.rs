//! Canonical field mapping.

mod archetype;
mod mapper;

pub use archetype::{AGE_BOUNDS, ARCHETYPES, Archetype, Plausibility, SEX_TOKENS, archetype};
pub use mapper::{ArchetypeMapping, CanonicalFieldMapper, FieldMatch};
