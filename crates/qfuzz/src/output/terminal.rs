//! Colored terminal summary of a feature table.

use colored::Colorize;

use qfuzz_core::statistics::mean;
use qfuzz_core::FeatureRecord;

use crate::pipeline::FeatureTable;

/// Format a per-scenario summary of `table`.
///
/// For every scenario the mean of each headline feature is shown over the
/// records that computed it; a dash marks a feature no record computed.
/// Failed pairs are listed after the scenarios.
///
/// # Example output
///
/// ```text
/// ── Feature summary ─────────────────────────────────────────
///   ideal (30 records)
///     entropy      2.431 bits    distance  0.318
///     fidelity     -             real      12.40 ms
///   noisy (29 records)
///     entropy      3.102 bits    distance  0.201
///     fidelity     0.874         real      15.02 ms
///
///   ⚠ 1 failed pair
///     • 2024-01-01_10-00-00.000_0007 / noisy: timeout (2 repetitions)
/// ```
pub fn format_summary(table: &FeatureTable) -> String {
    let mut out = String::new();
    let sep = "\u{2500}".repeat(58);

    out.push_str(&format!("\u{2500}\u{2500} {} {}\n", "Feature summary".bold(), sep));

    let scenarios = table.scenario_names();
    if scenarios.is_empty() {
        out.push_str(&format!("  {}\n", "no records".dimmed()));
    }

    for scenario in scenarios {
        let records: Vec<&FeatureRecord> = table.by_scenario(scenario).collect();

        let entropy = average(&records, |r| Some(r.entropy));
        let distance = average(&records, |r| Some(r.distance_to_uniform));
        let fidelity = average(&records, |r| r.fidelity);
        let real = average(&records, |r| r.real_time_ms);

        out.push_str(&format!(
            "  {} ({} records)\n",
            scenario.cyan().bold(),
            records.len()
        ));
        out.push_str(&format!(
            "    entropy      {:<13} distance  {}\n",
            show(entropy, 3, " bits"),
            show(distance, 3, "")
        ));
        out.push_str(&format!(
            "    fidelity     {} real      {}\n",
            fidelity_cell(fidelity, 13),
            show(real, 2, " ms")
        ));
    }

    if !table.failures.is_empty() {
        let n = table.failures.len();
        out.push_str(&format!(
            "\n  {} {} failed pair{}\n",
            "\u{26A0}".yellow(),
            n,
            if n == 1 { "" } else { "s" }
        ));
        for f in &table.failures {
            out.push_str(&format!(
                "    \u{2022} {} / {}: {} ({} repetitions)\n",
                f.program_id,
                f.scenario,
                f.kind.as_str().red(),
                f.completed
            ));
        }
    }

    if table.interrupted {
        out.push_str(&format!("\n  {}\n", "Run interrupted before all pairs completed".yellow()));
    }

    out
}

fn average<F>(records: &[&FeatureRecord], feature: F) -> Option<f64>
where
    F: Fn(&FeatureRecord) -> Option<f64>,
{
    let values: Vec<f64> = records.iter().filter_map(|&r| feature(r)).collect();
    mean(&values)
}

fn show(value: Option<f64>, precision: usize, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.precision$}{unit}"),
        None => "-".to_string(),
    }
}

/// Padded to `width` visible columns before coloring.
fn fidelity_cell(value: Option<f64>, width: usize) -> String {
    let text = format!("{:<width$}", show(value, 3, ""));
    match value {
        Some(v) if v >= 0.9 => text.green().to_string(),
        Some(v) if v >= 0.5 => text.yellow().to_string(),
        Some(_) => text.red().to_string(),
        None => text,
    }
}
