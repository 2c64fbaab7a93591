//! Core data model and pure statistics for cross-backend quantum program fuzzing.
//!
//! This crate holds everything that can be computed without touching a clock,
//! a random source, the filesystem, or an execution backend:
//!
//! - [`program`]: programs, operation kinds and the generation catalog
//! - [`histogram`]: validated outcome histograms
//! - [`statistics`]: entropy, distance-to-uniform, classical fidelity, variance
//! - [`outlier`]: outlier filtering for timing samples
//! - [`metrics`]: static structural metrics of a program
//! - [`features`]: one flat feature record per (program, scenario) pair
//!
//! It is typically used through the `qfuzz` crate, which adds program
//! generation, execution and the batch pipeline.
//!
//! ```ignore
//! use qfuzz_core::{statistics, OutcomeHistogram};
//!
//! let h = OutcomeHistogram::from_pairs([("00", 512), ("11", 512)])?;
//! assert_eq!(statistics::shannon_entropy(&h), 1.0);
//! assert_eq!(statistics::classical_fidelity(&h, &h)?, 1.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod error;
pub mod features;
pub mod histogram;
pub mod metrics;
pub mod outlier;
pub mod program;
pub mod statistics;

pub use error::InvalidInput;
pub use features::{
    extract_features, FeatureRecord, HardwareErrorMetrics, HardwareErrorProfile, TimingInputs,
};
pub use histogram::OutcomeHistogram;
pub use metrics::StaticMetrics;
pub use outlier::{
    filter_outliers, filter_outliers_with_stats, OutlierPolicy, OutlierStats, ReferenceValue,
    TimingSummary,
};
pub use program::{Catalog, Operation, OperationKind, Program, ProgramId};
