// file: src/utils/mod.rs
// description: utility functions module exports
// reference: internal module structure

pub mod hashing;
pub mod logging;
pub mod validation;

pub use hashing::{hash_str, hash_value, to_canonical_json};
pub use validation::Validator;
