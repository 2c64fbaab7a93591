//! Collaborator contracts: program execution and noise characterization.
//!
//! The core never executes programs itself. An [`ExecutionService`] compiles
//! a program for a scenario, submits it, and reports job status; a
//! [`NoiseProvider`] returns a backend's error profile. Both are injected.

use std::collections::BTreeMap;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use qfuzz_core::{HardwareErrorProfile, Program};

use crate::scenario::Scenario;

/// Backend-side failure reported by a collaborator.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credentials were missing or rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// No backend with this identifier exists.
    #[error("backend not found: {0}")]
    BackendNotFound(String),

    /// The collaborator rejected or could not complete the request.
    #[error("request failed: {0}")]
    Request(String),

    /// The collaborator answered with something that could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Local I/O failure while talking to the collaborator.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Lifecycle state of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a backend slot.
    Queued,
    /// Executing.
    Running,
    /// Finished; [`ExecutionService::result`] is valid.
    Succeeded,
    /// Finished with an error; [`ExecutionService::error_message`] is valid.
    Failed,
}

impl JobStatus {
    /// True for `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Raw output of a successful job, validated by the harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// Outcome counts keyed by bitstring.
    pub counts: BTreeMap<String, u64>,
    /// Run duration reported by the backend (excluding queueing), if any.
    #[serde(alias = "time_taken_ms", default)]
    pub reported_duration_ms: Option<f64>,
}

/// Program execution collaborator.
///
/// `status`, `result`, `error_message` and `cancel` take the job mutably so
/// implementations can cache what they learn about it.
pub trait ExecutionService {
    /// Backend-specific compiled form of a program.
    type Compiled;
    /// Handle to a submitted job.
    type Job;

    /// Compile `program` for `scenario`'s backend and noise settings.
    fn compile(&self, program: &Program, scenario: &Scenario)
        -> Result<Self::Compiled, ProviderError>;

    /// Submit a compiled program for `shots` executions.
    fn submit(&self, compiled: &Self::Compiled, shots: u32) -> Result<Self::Job, ProviderError>;

    /// Current job state.
    fn status(&self, job: &mut Self::Job) -> Result<JobStatus, ProviderError>;

    /// Outcome of a job in the `Succeeded` state.
    fn result(&self, job: &mut Self::Job) -> Result<JobResult, ProviderError>;

    /// Engine error message of a job in the `Failed` state.
    fn error_message(&self, job: &mut Self::Job) -> Result<String, ProviderError>;

    /// Best-effort cancellation of a job that is no longer awaited.
    fn cancel(&self, _job: &mut Self::Job) -> Result<(), ProviderError> {
        Ok(())
    }
}

impl<S: ExecutionService + ?Sized> ExecutionService for &S {
    type Compiled = S::Compiled;
    type Job = S::Job;

    fn compile(
        &self,
        program: &Program,
        scenario: &Scenario,
    ) -> Result<Self::Compiled, ProviderError> {
        (**self).compile(program, scenario)
    }

    fn submit(&self, compiled: &Self::Compiled, shots: u32) -> Result<Self::Job, ProviderError> {
        (**self).submit(compiled, shots)
    }

    fn status(&self, job: &mut Self::Job) -> Result<JobStatus, ProviderError> {
        (**self).status(job)
    }

    fn result(&self, job: &mut Self::Job) -> Result<JobResult, ProviderError> {
        (**self).result(job)
    }

    fn error_message(&self, job: &mut Self::Job) -> Result<String, ProviderError> {
        (**self).error_message(job)
    }

    fn cancel(&self, job: &mut Self::Job) -> Result<(), ProviderError> {
        (**self).cancel(job)
    }
}

/// Backend error characterization, as returned by a [`NoiseProvider`].
///
/// `payload` is opaque to this crate and handed back to the execution
/// service to bias a simulation. `properties`, when present, feed the
/// hardware error columns of the feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseProfile {
    /// Backend the profile characterizes.
    pub backend: String,
    /// Provider-specific noise model.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Calibration averages source.
    #[serde(default)]
    pub properties: Option<HardwareErrorProfile>,
}

/// Noise characterization collaborator.
pub trait NoiseProvider {
    /// Fetch the current error profile of `backend`.
    fn fetch_profile(&self, backend: &str) -> Result<NoiseProfile, ProviderError>;
}

impl<F> NoiseProvider for F
where
    F: Fn(&str) -> Result<NoiseProfile, ProviderError>,
{
    fn fetch_profile(&self, backend: &str) -> Result<NoiseProfile, ProviderError> {
        self(backend)
    }
}
