//! Default values shared across the workspace.

/// Default deterministic seed for reproducible program generation.
///
/// The value `0x7166757a7a` is "qfuzz" encoded in ASCII.
pub const DEFAULT_SEED: u64 = 0x7166_757a_7a;

/// Tukey fence multiplier for the IQR outlier policy.
pub const DEFAULT_IQR_FENCE: f64 = 1.5;

/// Multiplier `k` for the relative-bound outlier policy.
pub const DEFAULT_RELATIVE_MULTIPLIER: f64 = 2.0;

/// Name of the single-slot operation used to spread every slot before the random body.
pub const DEFAULT_SPREAD_KIND: &str = "h";

/// Name of the operation kind reported for the trailing measurement step.
pub const MEASURE_KIND: &str = "measure";

// =============================================================================
// Default run configuration
// =============================================================================

/// Default shots per execution.
pub const DEFAULT_SHOTS: u32 = 1024;

/// Default repetitions per (program, scenario) pair.
pub const DEFAULT_REPETITIONS: usize = 5;

/// Default number of programs per batch.
pub const DEFAULT_PROGRAM_COUNT: usize = 30;

/// Default resource slots per program.
pub const DEFAULT_SLOT_COUNT: usize = 4;

/// Default random operations per program.
pub const DEFAULT_OPERATION_COUNT: usize = 10;
