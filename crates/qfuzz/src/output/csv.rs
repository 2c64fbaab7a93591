//! CSV export of feature tables.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::pipeline::FeatureTable;

const FIXED_COLUMNS: &[&str] = &[
    "program_id",
    "scenario",
    "backend",
    "slot_count",
    "depth",
    "operation_count",
    "parallelism",
    "real_time_ms",
    "reported_time_ms",
    "compile_time_ms",
    "real_samples",
    "real_retained",
    "reported_retained",
    "shots",
    "distinct_outcomes",
    "entropy",
    "distance_to_uniform",
    "count_variance",
    "fidelity",
    "difference_entropy",
    "avg_t1",
    "avg_t2",
    "avg_readout_error",
    "avg_gate_error",
];

/// Write the table's records as CSV.
///
/// Every operation kind seen anywhere in the table gets an `ops_<kind>`
/// column; a record that never used a kind gets `0`. Values that were not
/// computed are written as empty cells.
pub fn write_csv<W: Write>(table: &FeatureTable, writer: W) -> io::Result<()> {
    let mut writer = BufWriter::new(writer);
    let kinds = table.operation_kinds();

    // Header
    let header: Vec<Cow<'_, str>> = FIXED_COLUMNS
        .iter()
        .map(|c| Cow::Borrowed(*c))
        .chain(kinds.iter().map(|k| Cow::Owned(format!("ops_{k}"))))
        .collect();
    write_row(&mut writer, header.iter().map(|c| &**c))?;

    // Data rows
    for r in &table.records {
        let mut row: Vec<String> = vec![
            r.program_id.clone(),
            r.scenario.clone(),
            r.backend.clone(),
            r.slot_count.to_string(),
            r.depth.to_string(),
            r.operation_count.to_string(),
            r.parallelism.to_string(),
            opt(r.real_time_ms),
            opt(r.reported_time_ms),
            opt(r.compile_time_ms),
            r.real_samples.to_string(),
            r.real_retained.to_string(),
            r.reported_retained.to_string(),
            r.shots.to_string(),
            r.distinct_outcomes.to_string(),
            r.entropy.to_string(),
            r.distance_to_uniform.to_string(),
            r.count_variance.to_string(),
            opt(r.fidelity),
            opt(r.difference_entropy),
            opt(r.hardware.avg_t1),
            opt(r.hardware.avg_t2),
            opt(r.hardware.avg_readout_error),
            opt(r.hardware.avg_gate_error),
        ];
        row.extend(
            kinds
                .iter()
                .map(|k| r.operation_counts.get(*k).copied().unwrap_or(0).to_string()),
        );
        write_row(&mut writer, row.iter().map(String::as_str))?;
    }

    writer.flush()
}

/// Write the table as CSV to `path`.
pub fn write_csv_file(table: &FeatureTable, path: &Path) -> io::Result<()> {
    write_csv(table, File::create(path)?)
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_row<'a, W, I>(writer: &mut W, fields: I) -> io::Result<()>
where
    W: Write,
    I: Iterator<Item = &'a str>,
{
    for (i, field) in fields.enumerate() {
        if i > 0 {
            writer.write_all(b",")?;
        }
        writer.write_all(escape(field).as_bytes())?;
    }
    writer.write_all(b"\n")
}

fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
