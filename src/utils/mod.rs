//! Utility modules shared by the pipeline, the CLI and the bot

pub mod color;
pub mod validation;

pub use color::{rgb_to_hsl, ColorParser, Hsl};
pub use validation::{NumericValidator, PathValidator};
