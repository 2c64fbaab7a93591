//! Batch feature aggregation over (program × scenario) pairs.
//!
//! For every program the reference scenario (if configured and present)
//! runs first; its last histogram becomes the fidelity reference for the
//! program's other scenarios. Each pair that produced at least one
//! histogram yields one [`FeatureRecord`]. Pairs that stopped early are
//! also listed in [`FeatureTable::failures`] with their error kind.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use qfuzz_core::statistics::mean;
use qfuzz_core::{
    extract_features, FeatureRecord, InvalidInput, OutcomeHistogram, Program, TimingInputs,
    TimingSummary,
};

use crate::config::Config;
use crate::error::{ErrorKind, Result, RunError};
use crate::harness::{CancelToken, Cancellation, Harness, Repetitions};
use crate::scenario::Scenario;
use crate::service::ExecutionService;

/// A pair that did not complete every repetition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairFailure {
    /// Program identity.
    pub program_id: String,
    /// Scenario name.
    pub scenario: String,
    /// Failure kind.
    pub kind: ErrorKind,
    /// Error message.
    pub message: String,
    /// Repetitions that completed before the failure.
    pub completed: usize,
}

/// Output of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    /// One record per pair with at least one histogram.
    pub records: Vec<FeatureRecord>,
    /// Pairs that stopped early.
    pub failures: Vec<PairFailure>,
    /// Set when the run was cancelled before every pair ran to completion.
    pub interrupted: bool,
}

impl FeatureTable {
    /// Scenario names in first-seen order.
    pub fn scenario_names(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.records
            .iter()
            .map(|r| r.scenario.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Records of one scenario.
    pub fn by_scenario<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FeatureRecord> {
        self.records.iter().filter(move |r| r.scenario == name)
    }

    /// Every operation kind counted in any record, sorted.
    pub fn operation_kinds(&self) -> Vec<&str> {
        self.records
            .iter()
            .flat_map(|r| r.operation_counts.keys().map(String::as_str))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Progress notification after each pair.
#[derive(Debug, Clone, Copy)]
pub struct PairReport<'a> {
    /// Program identity.
    pub program_id: &'a str,
    /// Scenario name.
    pub scenario: &'a str,
    /// Repetitions that completed.
    pub completed: usize,
    /// Failure kind, if the pair stopped early.
    pub error: Option<ErrorKind>,
}

/// Drives every (program, scenario) pair through the harness and aggregates
/// the results.
#[derive(Debug)]
pub struct Pipeline<S> {
    harness: Harness<S>,
    config: Config,
}

impl<S: ExecutionService> Pipeline<S> {
    /// Pipeline over `service`.
    pub fn new(service: S, config: Config) -> Self {
        Self {
            harness: Harness::new(service, config.poll),
            config,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every pair and collect one record per pair.
    ///
    /// Fails only on invalid input: an invalid configuration, no scenarios,
    /// or two scenarios sharing a name. Per-pair failures are reported in
    /// the returned table. Cancelling `cancel` cuts the current pair short,
    /// stops the run and marks the table as interrupted.
    pub fn run<F>(
        &self,
        programs: &[Program],
        scenarios: &[Scenario],
        cancel: &CancelToken,
        mut on_pair: F,
    ) -> Result<FeatureTable>
    where
        F: FnMut(PairReport<'_>),
    {
        self.config.validate()?;
        if scenarios.is_empty() {
            return Err(InvalidInput::InvalidConfig("no scenarios to run".into()).into());
        }
        let mut names = BTreeSet::new();
        for s in scenarios {
            if !names.insert(s.name.as_str()) {
                return Err(InvalidInput::InvalidConfig(format!(
                    "duplicate scenario name {:?}",
                    s.name
                ))
                .into());
            }
        }

        let ordered = self.order_scenarios(scenarios);
        let reference_name = self.config.reference_scenario.as_deref();
        let mut table = FeatureTable::default();

        'programs: for program in programs {
            let mut reference: Option<OutcomeHistogram> = None;

            for scenario in &ordered {
                if cancel.is_cancelled() {
                    table.interrupted = true;
                    break 'programs;
                }

                let is_reference = reference_name == Some(scenario.name.as_str());
                let pair = Cancellation::new(cancel.clone(), self.config.timeout);

                let (reps, failure) = match self.harness.run(
                    program,
                    scenario,
                    self.config.repetitions,
                    &pair,
                ) {
                    Ok(reps) => (reps, None),
                    Err(RunError { partial, error }) => (partial, Some(error)),
                };

                let mut error_kind = failure.as_ref().map(|e| e.kind());
                if let Some(error) = failure {
                    table.failures.push(PairFailure {
                        program_id: program.id().to_string(),
                        scenario: scenario.name.clone(),
                        kind: error.kind(),
                        message: error.to_string(),
                        completed: reps.len(),
                    });
                }

                if let Some(last) = reps.last_histogram() {
                    let reference_for_pair = if is_reference { None } else { reference.as_ref() };
                    match self.record(program, scenario, &reps, last, reference_for_pair) {
                        Ok(record) => table.records.push(record),
                        Err(e) => {
                            tracing::warn!(
                                program = %program.id(),
                                scenario = %scenario.name,
                                error = %e,
                                "could not extract features"
                            );
                            error_kind.get_or_insert(ErrorKind::InvalidInput);
                            table.failures.push(PairFailure {
                                program_id: program.id().to_string(),
                                scenario: scenario.name.clone(),
                                kind: ErrorKind::InvalidInput,
                                message: e.to_string(),
                                completed: reps.len(),
                            });
                        }
                    }
                    if is_reference {
                        reference = Some(last.clone());
                    }
                }

                on_pair(PairReport {
                    program_id: program.id().as_str(),
                    scenario: &scenario.name,
                    completed: reps.len(),
                    error: error_kind,
                });

                // The pair in flight may have been cut short.
                if cancel.is_cancelled() {
                    table.interrupted = true;
                    break 'programs;
                }
            }
        }

        tracing::info!(
            records = table.records.len(),
            failures = table.failures.len(),
            interrupted = table.interrupted,
            "pipeline finished"
        );
        Ok(table)
    }

    fn order_scenarios<'a>(&self, scenarios: &'a [Scenario]) -> Vec<&'a Scenario> {
        let reference = self.config.reference_scenario.as_deref();
        let (mut first, rest): (Vec<&Scenario>, Vec<&Scenario>) = scenarios
            .iter()
            .partition(|s| reference == Some(s.name.as_str()));
        first.extend(rest);
        first
    }

    fn record(
        &self,
        program: &Program,
        scenario: &Scenario,
        reps: &Repetitions,
        histogram: &OutcomeHistogram,
        reference: Option<&OutcomeHistogram>,
    ) -> std::result::Result<FeatureRecord, InvalidInput> {
        let policy = &self.config.outlier_policy;

        let real = TimingSummary::from_samples(&reps.real_times(), policy)?;
        let reported_samples = reps.reported_times();
        let reported = if reported_samples.is_empty() {
            None
        } else {
            Some(TimingSummary::from_samples(&reported_samples, policy)?)
        };

        let timing = TimingInputs {
            real: Some(real),
            reported,
            compile_ms: mean(&reps.compile_times()),
        };

        extract_features(
            program,
            &scenario.name,
            &scenario.backend,
            histogram,
            &timing,
            reference,
            scenario.calibration.as_ref(),
        )
    }
}
