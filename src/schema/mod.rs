//! Semantic type schemas for Koreo resource kinds

mod koreo;
mod structure;

pub use koreo::{schema_for, supported_kinds, API_GROUP};
pub use structure::{FieldSpec, KeyFn, Structure};
