//! Execution harness: drives one program through one scenario, repeatedly.
//!
//! Per repetition the harness compiles the program (timed separately),
//! submits it, blocks in a cancellable poll loop until the job is terminal,
//! and records the wall-clock duration from submission to that point next
//! to the backend-reported run duration.
//!
//! A failed job aborts the remaining repetitions of the pair. Repetitions
//! completed before it stay valid and are returned inside [`RunError`].

mod poll;

pub use poll::{wait_for_terminal, CancelToken, Cancellation, WaitOutcome};

use std::time::Instant;

use serde::{Deserialize, Serialize};

use qfuzz_core::{InvalidInput, OutcomeHistogram, Program};

use crate::config::PollConfig;
use crate::error::{Error, RunError};
use crate::scenario::Scenario;
use crate::service::{ExecutionService, JobStatus};

/// Measurements of one successful repetition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repetition {
    /// Validated outcome histogram.
    pub histogram: OutcomeHistogram,
    /// Wall-clock submit-to-terminal duration in ms.
    pub real_ms: f64,
    /// Backend-reported run duration in ms, if the backend reports one.
    pub reported_ms: Option<f64>,
    /// Duration of the compilation step in ms.
    pub compile_ms: f64,
}

/// Successful repetitions of one (program, scenario) pair, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repetitions {
    /// Completed repetitions.
    pub runs: Vec<Repetition>,
}

impl Repetitions {
    /// Number of completed repetitions.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// True if no repetition completed.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Outcome histograms in repetition order.
    pub fn histograms(&self) -> Vec<&OutcomeHistogram> {
        self.runs.iter().map(|r| &r.histogram).collect()
    }

    /// Histogram of the last completed repetition.
    pub fn last_histogram(&self) -> Option<&OutcomeHistogram> {
        self.runs.last().map(|r| &r.histogram)
    }

    /// Real-time samples in ms.
    pub fn real_times(&self) -> Vec<f64> {
        self.runs.iter().map(|r| r.real_ms).collect()
    }

    /// Backend-reported samples in ms; repetitions without one are skipped.
    pub fn reported_times(&self) -> Vec<f64> {
        self.runs.iter().filter_map(|r| r.reported_ms).collect()
    }

    /// Compilation durations in ms.
    pub fn compile_times(&self) -> Vec<f64> {
        self.runs.iter().map(|r| r.compile_ms).collect()
    }
}

/// Runs programs on an [`ExecutionService`].
#[derive(Debug)]
pub struct Harness<S> {
    service: S,
    poll: PollConfig,
}

impl<S: ExecutionService> Harness<S> {
    /// Harness over `service` with the given poll intervals.
    pub fn new(service: S, poll: PollConfig) -> Self {
        Self { service, poll }
    }

    /// The wrapped service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Execute `program` under `scenario` `repetitions` times.
    ///
    /// Returns every repetition on success. On the first failure returns a
    /// [`RunError`] holding the repetitions completed so far and the cause:
    /// [`Error::ExecutionFailure`] for a failed job, [`Error::Timeout`] when
    /// `cancel` fires first, [`Error::Provider`] when a service call fails,
    /// and [`Error::InvalidInput`] when the service returns a malformed
    /// histogram.
    pub fn run(
        &self,
        program: &Program,
        scenario: &Scenario,
        repetitions: usize,
        cancel: &Cancellation,
    ) -> Result<Repetitions, RunError> {
        let mut done = Repetitions::default();

        if repetitions == 0 {
            return Err(RunError {
                partial: done,
                error: InvalidInput::InvalidConfig("repetitions must be positive".into()).into(),
            });
        }

        let started = Instant::now();
        let deadline = cancel.deadline_from(started);

        for index in 0..repetitions {
            let repetition = index + 1;

            let expired = deadline.is_some_and(|d| Instant::now() >= d);
            if expired || cancel.token.is_cancelled() {
                let error = self.timeout_error(scenario, repetition, started);
                return Err(RunError { partial: done, error });
            }

            match self.run_once(program, scenario, repetition, started, deadline, cancel) {
                Ok(run) => {
                    tracing::debug!(
                        program = %program.id(),
                        scenario = %scenario.name,
                        repetition,
                        real_ms = run.real_ms,
                        reported_ms = ?run.reported_ms,
                        compile_ms = run.compile_ms,
                        "repetition complete"
                    );
                    done.runs.push(run);
                }
                Err(error) => {
                    tracing::warn!(
                        program = %program.id(),
                        scenario = %scenario.name,
                        repetition,
                        completed = done.len(),
                        error = %error,
                        "aborting remaining repetitions"
                    );
                    return Err(RunError { partial: done, error });
                }
            }
        }

        Ok(done)
    }

    fn run_once(
        &self,
        program: &Program,
        scenario: &Scenario,
        repetition: usize,
        started: Instant,
        deadline: Option<Instant>,
        cancel: &Cancellation,
    ) -> Result<Repetition, Error> {
        let backend = scenario.backend.as_str();

        let compile_start = Instant::now();
        let compiled = self
            .service
            .compile(program, scenario)
            .map_err(Error::provider(backend, "compile"))?;
        let compile_ms = millis_since(compile_start);

        let submit_start = Instant::now();
        let mut job = self
            .service
            .submit(&compiled, scenario.shots)
            .map_err(Error::provider(backend, "submit"))?;

        let waited = wait_for_terminal(
            || self.service.status(&mut job),
            self.poll.interval_for(scenario.kind),
            &cancel.token,
            deadline,
        );
        let outcome = match waited {
            Ok(outcome) => outcome,
            Err(e) => {
                self.abandon(&mut job, backend);
                return Err(Error::provider(backend, "status")(e));
            }
        };
        let real_ms = millis_since(submit_start);

        match outcome {
            WaitOutcome::Expired => {
                self.abandon(&mut job, backend);
                Err(self.timeout_error(scenario, repetition, started))
            }
            WaitOutcome::Terminal(JobStatus::Failed) => {
                let message = self
                    .service
                    .error_message(&mut job)
                    .unwrap_or_else(|e| format!("job failed; error message unavailable: {e}"));
                Err(Error::ExecutionFailure {
                    backend: backend.to_string(),
                    repetition,
                    message,
                })
            }
            WaitOutcome::Terminal(_) => {
                let result = self
                    .service
                    .result(&mut job)
                    .map_err(Error::provider(backend, "result"))?;

                let histogram = OutcomeHistogram::new(result.counts)?;
                histogram.check_shots(u64::from(scenario.shots))?;
                let width = program.measured_bits();
                if width > 0 && histogram.width() != width {
                    return Err(InvalidInput::WidthMismatch {
                        left: histogram.width(),
                        right: width,
                    }
                    .into());
                }

                let reported_ms = match result.reported_duration_ms {
                    Some(ms) if ms.is_finite() && ms >= 0.0 => Some(ms),
                    Some(ms) => {
                        tracing::warn!(
                            backend,
                            reported_ms = ms,
                            "ignoring invalid reported duration"
                        );
                        None
                    }
                    None => None,
                };

                Ok(Repetition {
                    histogram,
                    real_ms,
                    reported_ms,
                    compile_ms,
                })
            }
        }
    }

    /// Best-effort cancel of a job the harness stops waiting for.
    fn abandon(&self, job: &mut S::Job, backend: &str) {
        if let Err(e) = self.service.cancel(job) {
            tracing::warn!(backend, error = %e, "failed to cancel abandoned job");
        }
    }

    fn timeout_error(&self, scenario: &Scenario, repetition: usize, started: Instant) -> Error {
        Error::Timeout {
            backend: scenario.backend.clone(),
            repetition,
            waited: started.elapsed(),
        }
    }
}

fn millis_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1_000.0
}
