//! Feature records: one flat row per (program, scenario) pair.
//!
//! [`extract_features`] combines static program metrics, timing aggregates,
//! outcome statistics and optional hardware error averages. It performs no
//! I/O; every input is already materialized. Statistics that could not be
//! computed (no reference histogram, no surviving timing samples, no hardware
//! profile) are `None`, never a default number.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::InvalidInput;
use crate::histogram::OutcomeHistogram;
use crate::metrics::StaticMetrics;
use crate::outlier::TimingSummary;
use crate::program::Program;
use crate::statistics::outcome::{
    classical_fidelity, count_variance, difference_entropy, distance_to_uniform, shannon_entropy,
};
use crate::statistics::quantile::mean;

/// Error characterization of a physical backend.
///
/// Per-slot decoherence times and readout errors, plus one error rate per
/// calibrated operation. Units follow whatever the provider reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareErrorProfile {
    /// Relaxation time per slot.
    #[serde(default)]
    pub t1: Vec<f64>,
    /// Dephasing time per slot.
    #[serde(default)]
    pub t2: Vec<f64>,
    /// Readout error probability per slot.
    #[serde(default)]
    pub readout_error: Vec<f64>,
    /// Error probability per calibrated operation.
    #[serde(default)]
    pub gate_error: Vec<f64>,
}

impl HardwareErrorProfile {
    /// Average every field, ignoring non-finite entries.
    pub fn metrics(&self) -> HardwareErrorMetrics {
        HardwareErrorMetrics {
            avg_t1: finite_mean(&self.t1),
            avg_t2: finite_mean(&self.t2),
            avg_readout_error: finite_mean(&self.readout_error),
            avg_gate_error: finite_mean(&self.gate_error),
        }
    }
}

fn finite_mean(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    mean(&finite)
}

/// Scalar averages of a [`HardwareErrorProfile`]. `None` when the profile
/// carried no usable values for that field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareErrorMetrics {
    /// Mean T1.
    pub avg_t1: Option<f64>,
    /// Mean T2.
    pub avg_t2: Option<f64>,
    /// Mean readout error.
    pub avg_readout_error: Option<f64>,
    /// Mean operation error.
    pub avg_gate_error: Option<f64>,
}

/// Timing aggregates for one pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimingInputs {
    /// Wall-clock submit-to-terminal durations after filtering.
    pub real: Option<TimingSummary>,
    /// Backend-reported run durations after filtering.
    pub reported: Option<TimingSummary>,
    /// Mean duration of the backend compilation step.
    pub compile_ms: Option<f64>,
}

impl TimingInputs {
    /// Inputs from plain means, for callers that aggregate timings themselves.
    pub fn from_means(real_ms: Option<f64>, reported_ms: Option<f64>) -> Self {
        let single = |m: Option<f64>| {
            m.map(|m| TimingSummary {
                raw_count: 1,
                retained_count: 1,
                mean: Some(m),
                std_dev: Some(0.0),
            })
        };
        Self {
            real: single(real_ms),
            reported: single(reported_ms),
            compile_ms: None,
        }
    }
}

/// One row of the feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Program identity.
    pub program_id: String,
    /// Scenario name.
    pub scenario: String,
    /// Backend the scenario ran on.
    pub backend: String,

    /// Resource slots.
    pub slot_count: usize,
    /// Longest dependency chain.
    pub depth: usize,
    /// Total operations, measurement included.
    pub operation_count: usize,
    /// Operations per kind.
    pub operation_counts: BTreeMap<String, usize>,
    /// `operation_count / depth`.
    pub parallelism: f64,

    /// Mean wall-clock duration in ms.
    pub real_time_ms: Option<f64>,
    /// Mean backend-reported duration in ms.
    pub reported_time_ms: Option<f64>,
    /// Mean compilation duration in ms.
    pub compile_time_ms: Option<f64>,
    /// Real-time samples before filtering.
    pub real_samples: usize,
    /// Real-time samples kept by the outlier filter.
    pub real_retained: usize,
    /// Reported-time samples kept by the outlier filter.
    pub reported_retained: usize,

    /// Shots in the histogram the statistics were computed from.
    pub shots: u64,
    /// Distinct outcomes observed.
    pub distinct_outcomes: usize,
    /// Shannon entropy in bits.
    pub entropy: f64,
    /// Rank-aligned Wasserstein distance to uniform.
    pub distance_to_uniform: f64,
    /// Variance of the probability vector.
    pub count_variance: f64,
    /// Fidelity to the reference histogram, if one was supplied.
    pub fidelity: Option<f64>,
    /// Entropy of the disagreement with the reference histogram.
    pub difference_entropy: Option<f64>,

    /// Hardware error averages, if the scenario carried a profile.
    #[serde(flatten)]
    pub hardware: HardwareErrorMetrics,
}

/// Build the feature record for one (program, scenario) pair.
///
/// Fails if `histogram` (or `reference`) does not measure one bit per slot of
/// a measured program.
pub fn extract_features(
    program: &Program,
    scenario: &str,
    backend: &str,
    histogram: &OutcomeHistogram,
    timing: &TimingInputs,
    reference: Option<&OutcomeHistogram>,
    hardware: Option<&HardwareErrorProfile>,
) -> Result<FeatureRecord, InvalidInput> {
    let expected_width = program.measured_bits();
    if expected_width > 0 && histogram.width() != expected_width {
        return Err(InvalidInput::WidthMismatch {
            left: histogram.width(),
            right: expected_width,
        });
    }

    let metrics = StaticMetrics::of(program);

    let (fidelity, diff_entropy) = match reference {
        Some(r) => (
            Some(classical_fidelity(histogram, r)?),
            difference_entropy(histogram, r)?,
        ),
        None => (None, None),
    };

    Ok(FeatureRecord {
        program_id: program.id().to_string(),
        scenario: scenario.to_string(),
        backend: backend.to_string(),

        slot_count: metrics.slot_count,
        depth: metrics.depth,
        operation_count: metrics.operation_count,
        operation_counts: metrics.operation_counts,
        parallelism: metrics.parallelism,

        real_time_ms: timing.real.and_then(|s| s.mean),
        reported_time_ms: timing.reported.and_then(|s| s.mean),
        compile_time_ms: timing.compile_ms,
        real_samples: timing.real.map_or(0, |s| s.raw_count),
        real_retained: timing.real.map_or(0, |s| s.retained_count),
        reported_retained: timing.reported.map_or(0, |s| s.retained_count),

        shots: histogram.total(),
        distinct_outcomes: histogram.len(),
        entropy: shannon_entropy(histogram),
        distance_to_uniform: distance_to_uniform(histogram),
        count_variance: count_variance(histogram),
        fidelity,
        difference_entropy: diff_entropy,

        hardware: hardware.map(HardwareErrorProfile::metrics).unwrap_or_default(),
    })
}
