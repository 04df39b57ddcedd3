//! Domain layer types and invariants.

pub mod error;
pub mod files;
pub mod flip;
pub mod profiles;
