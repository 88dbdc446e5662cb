//! CLI command implementations.

pub mod detect;
pub mod inspect;
pub mod normalize;
