//! Command-line front end for the sticker pipeline
//!
//! Only compiled with the `cli` feature.

mod config;
#[path = "main.rs"]
mod main_impl;

pub use main_impl::{main, Cli, CliCorner, CliOutputFormat, CliStrategy};
