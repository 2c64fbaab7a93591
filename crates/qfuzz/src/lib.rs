//! # qfuzz
//!
//! Randomized quantum program fuzzing with cross-backend statistical
//! comparison.
//!
//! The crate generates random programs from an operation catalog, runs each
//! one under several execution scenarios (noiseless simulation, simulation
//! biased by a hardware noise profile, physical hardware), and turns every
//! (program, scenario) pair into one flat feature record:
//! - structural metrics of the program
//! - outlier-filtered timing means
//! - outcome-distribution statistics (entropy, distance to uniform, variance)
//! - fidelity to the reference scenario's histogram
//! - averaged hardware error rates
//!
//! Execution and noise characterization are collaborators: implement
//! [`ExecutionService`] and [`NoiseProvider`], or drive an external toolkit
//! with [`CommandExecutionService`] and [`CommandNoiseProvider`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use qfuzz::{CancelToken, Catalog, Config, FuzzOptions, Fuzzer, Pipeline, Scenario};
//!
//! let config = Config::quick().seed(7);
//! let programs = Fuzzer::from_seed(Catalog::standard(), config.fuzz.seed).generate(
//!     config.fuzz.program_count,
//!     config.fuzz.slot_count,
//!     config.fuzz.operation_count,
//!     &FuzzOptions::from(&config.fuzz),
//! )?;
//!
//! let scenarios = [Scenario::ideal("aer_simulator", config.shots)];
//! let table = Pipeline::new(my_service, config).run(
//!     &programs,
//!     &scenarios,
//!     &CancelToken::new(),
//!     |_| {},
//! )?;
//! qfuzz::output::write_csv_file(&table, "features.csv".as_ref())?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod error;
mod generator;
mod noise_cache;
mod pipeline;
mod scenario;
mod service;

// Functional modules
pub mod command;
pub mod harness;
pub mod output;

// Re-exports for public API
pub use command::{CommandExecutionService, CommandNoiseProvider, Toolkit};
pub use config::{Config, FuzzConfig, PollConfig};
pub use error::{Error, ErrorKind, Result, RunError};
pub use generator::{FuzzOptions, Fuzzer};
pub use harness::{CancelToken, Cancellation, Harness, Repetition, Repetitions};
pub use noise_cache::NoiseProfileCache;
pub use pipeline::{FeatureTable, PairFailure, PairReport, Pipeline};
pub use scenario::{noisy_scenario, BackendKind, Scenario, HARDWARE, IDEAL, NOISY};
pub use service::{
    ExecutionService, JobResult, JobStatus, NoiseProfile, NoiseProvider, ProviderError,
};

// Re-export the core data model for convenience
pub use qfuzz_core::{
    constants, statistics, Catalog, FeatureRecord, HardwareErrorMetrics, HardwareErrorProfile,
    InvalidInput, Operation, OperationKind, OutcomeHistogram, OutlierPolicy, Program, ProgramId,
    ReferenceValue, StaticMetrics, TimingSummary,
};
