//! Scripted in-memory execution service.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use qfuzz::{ExecutionService, JobResult, JobStatus, Program, ProviderError, Scenario};

/// What one submitted job does.
#[derive(Debug, Clone)]
pub enum Step {
    /// Run for `polls` status queries, then succeed with `counts`.
    Succeed {
        counts: Vec<(&'static str, u64)>,
        reported_ms: Option<f64>,
        polls: usize,
    },
    /// Fail with an engine message.
    Fail(&'static str),
    /// Stay queued forever.
    Hang,
    /// Status queries fail with a provider error.
    Unreachable(&'static str),
}

impl Step {
    pub fn ok(counts: &[(&'static str, u64)]) -> Self {
        Step::Succeed {
            counts: counts.to_vec(),
            reported_ms: Some(1.0),
            polls: 0,
        }
    }
}

type Script = Box<dyn Fn(&str, usize) -> Step + Send + Sync>;

/// Execution service whose jobs follow a script of `(backend, submission index)`.
pub struct MockService {
    script: Script,
    submitted: Mutex<usize>,
    pub log: Mutex<Vec<String>>,
    pub cancelled: Mutex<usize>,
}

impl MockService {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str, usize) -> Step + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            submitted: Mutex::new(0),
            log: Mutex::new(Vec::new()),
            cancelled: Mutex::new(0),
        }
    }

    /// Every job on every backend returns `counts`.
    pub fn always(counts: &'static [(&'static str, u64)]) -> Self {
        Self::new(move |_, _| Step::ok(counts))
    }

    pub fn submissions(&self) -> usize {
        *self.submitted.lock().unwrap()
    }
}

pub struct Compiled {
    backend: String,
    program: String,
}

pub struct Job {
    step: Step,
    polls: usize,
}

impl ExecutionService for MockService {
    type Compiled = Compiled;
    type Job = Job;

    fn compile(&self, program: &Program, scenario: &Scenario) -> Result<Compiled, ProviderError> {
        Ok(Compiled {
            backend: scenario.backend.clone(),
            program: program.id().to_string(),
        })
    }

    fn submit(&self, compiled: &Compiled, _shots: u32) -> Result<Job, ProviderError> {
        let mut submitted = self.submitted.lock().unwrap();
        let step = (self.script)(&compiled.backend, *submitted);
        *submitted += 1;
        self.log
            .lock()
            .unwrap()
            .push(format!("{}@{}", compiled.program, compiled.backend));
        Ok(Job { step, polls: 0 })
    }

    fn status(&self, job: &mut Job) -> Result<JobStatus, ProviderError> {
        job.polls += 1;
        Ok(match &job.step {
            Step::Succeed { polls, .. } if job.polls <= *polls => JobStatus::Running,
            Step::Succeed { .. } => JobStatus::Succeeded,
            Step::Fail(_) => JobStatus::Failed,
            Step::Hang => JobStatus::Queued,
            Step::Unreachable(msg) => return Err(ProviderError::Request(msg.to_string())),
        })
    }

    fn result(&self, job: &mut Job) -> Result<JobResult, ProviderError> {
        match &job.step {
            Step::Succeed {
                counts,
                reported_ms,
                ..
            } => Ok(JobResult {
                counts: counts
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect::<BTreeMap<_, _>>(),
                reported_duration_ms: *reported_ms,
            }),
            _ => Err(ProviderError::Request("no result".into())),
        }
    }

    fn error_message(&self, job: &mut Job) -> Result<String, ProviderError> {
        match &job.step {
            Step::Fail(msg) => Ok(msg.to_string()),
            _ => Err(ProviderError::Request("job did not fail".into())),
        }
    }

    fn cancel(&self, _job: &mut Job) -> Result<(), ProviderError> {
        *self.cancelled.lock().unwrap() += 1;
        Ok(())
    }
}
