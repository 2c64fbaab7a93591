//! Feature table formatting.
//!
//! This module provides:
//! - CSV export with one column per operation kind
//! - JSON serialization of the whole table
//! - A colored per-scenario terminal summary

mod csv;
mod json;
mod terminal;

pub use self::csv::{write_csv, write_csv_file};
pub use json::{to_json, to_json_pretty, write_json_file};
pub use terminal::format_summary;
