//! Consolidated validation utilities

pub mod numeric;
pub mod path;

pub use numeric::NumericValidator;
pub use path::PathValidator;
