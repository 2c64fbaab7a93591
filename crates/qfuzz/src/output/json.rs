//! JSON serialization of feature tables.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::pipeline::FeatureTable;

/// Serialize a table to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for a table
/// built by the pipeline).
pub fn to_json(table: &FeatureTable) -> Result<String, serde_json::Error> {
    serde_json::to_string(table)
}

/// Serialize a table to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_pretty(table: &FeatureTable) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(table)
}

/// Write a pretty-printed table to `path`.
pub fn write_json_file(table: &FeatureTable, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, table)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
