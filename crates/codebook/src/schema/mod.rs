//! Canonical field model: types, descriptors and dictionaries.

mod confidence;
mod dictionary;
mod field;
mod persistence;
mod types;

pub use confidence::score as score_confidence;
pub(crate) use persistence::write_json;
pub use dictionary::DataDictionary;
pub use field::{FieldDescriptor, RangeRule, ValidationRules};
pub use types::{Choice, FieldType, SourceFormat};
