//! Collaborators backed by an external toolkit executable.
//!
//! The toolkit speaks JSON over standard streams:
//!
//! - `<cmd> run` reads `{"backend", "shots", "program", "noise"}` on stdin and
//!   prints `{"counts": {...}, "time_taken_ms": ...}` on stdout. A non-zero
//!   exit status marks the job failed; stderr is the error message.
//! - `<cmd> noise <backend>` prints a [`NoiseProfile`] on stdout.
//!
//! Job output is spooled to temporary files rather than pipes, so a child
//! that writes a lot never blocks while the harness is polling it.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;

use serde::Serialize;
use tempfile::NamedTempFile;

use qfuzz_core::Program;

use crate::scenario::Scenario;
use crate::service::{
    ExecutionService, JobResult, JobStatus, NoiseProfile, NoiseProvider, ProviderError,
};

/// Toolkit executable plus leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolkit {
    program: OsString,
    args: Vec<OsString>,
}

impl Toolkit {
    /// Toolkit invoked as `program`.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument placed before the subcommand.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    fn command(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(subcommand);
        cmd
    }

    fn display(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// Execution request written to the toolkit's stdin.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledRequest {
    backend: String,
    program: Program,
    noise: Option<NoiseProfile>,
}

#[derive(Serialize)]
struct RunRequest<'a> {
    backend: &'a str,
    shots: u32,
    program: &'a Program,
    noise: Option<&'a NoiseProfile>,
}

/// A running or finished toolkit process.
///
/// Dropping a job that has not exited kills the process.
pub struct CommandJob {
    child: Child,
    exit: Option<ExitStatus>,
    stdout: NamedTempFile,
    stderr: NamedTempFile,
}

impl fmt::Debug for CommandJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandJob")
            .field("pid", &self.child.id())
            .field("exit", &self.exit)
            .finish_non_exhaustive()
    }
}

impl CommandJob {
    fn poll_exit(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.exit.is_none() {
            self.exit = self.child.try_wait()?;
        }
        Ok(self.exit)
    }
}

impl Drop for CommandJob {
    fn drop(&mut self) {
        if self.exit.is_none() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// [`ExecutionService`] that runs each job as a toolkit subprocess.
#[derive(Debug, Clone)]
pub struct CommandExecutionService {
    toolkit: Toolkit,
}

impl CommandExecutionService {
    /// Service over `toolkit`.
    pub fn new(toolkit: Toolkit) -> Self {
        Self { toolkit }
    }
}

impl ExecutionService for CommandExecutionService {
    type Compiled = CompiledRequest;
    type Job = CommandJob;

    fn compile(
        &self,
        program: &Program,
        scenario: &Scenario,
    ) -> Result<Self::Compiled, ProviderError> {
        Ok(CompiledRequest {
            backend: scenario.backend.clone(),
            program: program.clone(),
            noise: scenario.noise.clone(),
        })
    }

    fn submit(&self, compiled: &Self::Compiled, shots: u32) -> Result<Self::Job, ProviderError> {
        let stdout = NamedTempFile::new()?;
        let stderr = NamedTempFile::new()?;

        let child = self
            .toolkit
            .command("run")
            .stdin(Stdio::piped())
            .stdout(Stdio::from(stdout.reopen()?))
            .stderr(Stdio::from(stderr.reopen()?))
            .spawn()?;

        let request = RunRequest {
            backend: &compiled.backend,
            shots,
            program: &compiled.program,
            noise: compiled.noise.as_ref(),
        };

        let mut job = CommandJob {
            child,
            exit: None,
            stdout,
            stderr,
        };

        let body = serde_json::to_vec(&request)
            .map_err(|e| ProviderError::Request(format!("could not encode request: {e}")))?;
        if let Some(mut stdin) = job.child.stdin.take() {
            // A child that never reads stdin must not block submit.
            thread::spawn(move || match stdin.write_all(&body) {
                Ok(()) => {}
                // A toolkit that exits without reading its input reports through its status.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    tracing::debug!("toolkit closed stdin before reading the request");
                }
                Err(e) => tracing::warn!(error = %e, "failed to write request to toolkit"),
            });
        }

        tracing::debug!(
            toolkit = %self.toolkit.display(),
            backend = %compiled.backend,
            shots,
            pid = job.child.id(),
            "submitted job"
        );
        Ok(job)
    }

    fn status(&self, job: &mut Self::Job) -> Result<JobStatus, ProviderError> {
        Ok(match job.poll_exit()? {
            None => JobStatus::Running,
            Some(status) if status.success() => JobStatus::Succeeded,
            Some(_) => JobStatus::Failed,
        })
    }

    fn result(&self, job: &mut Self::Job) -> Result<JobResult, ProviderError> {
        let text = fs::read_to_string(job.stdout.path())?;
        serde_json::from_str(text.trim())
            .map_err(|e| ProviderError::Malformed(format!("job output: {e}")))
    }

    fn error_message(&self, job: &mut Self::Job) -> Result<String, ProviderError> {
        let text = fs::read_to_string(job.stderr.path())?;
        let text = text.trim();
        if !text.is_empty() {
            return Ok(text.to_string());
        }
        Ok(match job.poll_exit()? {
            Some(status) => format!("{} exited with {status}", self.toolkit.display()),
            None => format!("{} reported no error", self.toolkit.display()),
        })
    }

    fn cancel(&self, job: &mut Self::Job) -> Result<(), ProviderError> {
        if job.poll_exit()?.is_none() {
            job.child.kill()?;
            job.exit = Some(job.child.wait()?);
        }
        Ok(())
    }
}

/// [`NoiseProvider`] that asks the toolkit for a backend's noise profile.
#[derive(Debug, Clone)]
pub struct CommandNoiseProvider {
    toolkit: Toolkit,
}

impl CommandNoiseProvider {
    /// Provider over `toolkit`.
    pub fn new(toolkit: Toolkit) -> Self {
        Self { toolkit }
    }
}

impl NoiseProvider for CommandNoiseProvider {
    fn fetch_profile(&self, backend: &str) -> Result<NoiseProfile, ProviderError> {
        let output = self
            .toolkit
            .command("noise")
            .arg(backend)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::Request(format!(
                "{} noise {backend} exited with {}: {}",
                self.toolkit.display(),
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ProviderError::Malformed(format!("noise profile: {e}")))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::PollConfig;
    use crate::error::Error;
    use crate::harness::{Cancellation, Harness};
    use qfuzz_core::{Operation, ProgramId};
    use std::time::Duration;

    fn sh(script: &str) -> Toolkit {
        // `sh -c script <subcommand> <args...>`: the subcommand lands in $0.
        Toolkit::new("sh").arg("-c").arg(script)
    }

    fn program() -> Program {
        Program::new(
            ProgramId::from("p"),
            1,
            vec![Operation::new("h", [0])],
            true,
        )
        .unwrap()
    }

    fn poll() -> PollConfig {
        PollConfig {
            simulator_interval: Duration::from_millis(2),
            hardware_interval: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_successful_run() {
        let service = CommandExecutionService::new(sh(
            r#"cat > /dev/null; echo '{"counts":{"0":3,"1":1},"time_taken_ms":2.5}'"#,
        ));
        let reps = Harness::new(service, poll())
            .run(&program(), &Scenario::ideal("sim", 4), 2, &Cancellation::none())
            .unwrap();
        assert_eq!(reps.len(), 2);
        assert_eq!(reps.reported_times(), vec![2.5, 2.5]);
        assert_eq!(reps.last_histogram().unwrap().count("1"), 1);
    }

    #[test]
    fn test_request_reaches_toolkit() {
        let service = CommandExecutionService::new(sh(
            r#"grep -q '"shots":4' && echo '{"counts":{"0":4}}' || exit 1"#,
        ));
        let reps = Harness::new(service, poll())
            .run(&program(), &Scenario::ideal("sim", 4), 1, &Cancellation::none())
            .unwrap();
        assert_eq!(reps.reported_times(), Vec::<f64>::new());
    }

    #[test]
    fn test_nonzero_exit_is_execution_failure() {
        let service =
            CommandExecutionService::new(sh("cat > /dev/null; echo 'bad circuit' >&2; exit 3"));
        let err = Harness::new(service, poll())
            .run(&program(), &Scenario::ideal("sim", 4), 3, &Cancellation::none())
            .unwrap_err();
        assert!(err.partial.is_empty());
        match err.error {
            Error::ExecutionFailure { message, repetition, .. } => {
                assert_eq!(message, "bad circuit");
                assert_eq!(repetition, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_slow_job_times_out_and_is_killed() {
        let service = CommandExecutionService::new(sh("sleep 30"));
        let err = Harness::new(service, poll())
            .run(
                &program(),
                &Scenario::ideal("sim", 4),
                1,
                &Cancellation::with_timeout(Duration::from_millis(50)),
            )
            .unwrap_err();
        assert!(matches!(err.error, Error::Timeout { .. }));
    }

    #[test]
    fn test_child_ignoring_large_request_still_times_out() {
        let operations = (0..20_000).map(|_| Operation::new("h", [0])).collect();
        let program = Program::new(ProgramId::from("wide"), 1, operations, true).unwrap();
        let service = CommandExecutionService::new(sh("sleep 30"));

        let start = std::time::Instant::now();
        let err = Harness::new(service, poll())
            .run(
                &program,
                &Scenario::ideal("sim", 4),
                1,
                &Cancellation::with_timeout(Duration::from_millis(50)),
            )
            .unwrap_err();
        assert!(matches!(err.error, Error::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_noise_provider() {
        let provider = CommandNoiseProvider::new(sh(
            r#"echo "{\"backend\":\"$1\",\"payload\":{\"p\":0.01}}""#,
        ));
        let profile = provider.fetch_profile("fake_kyiv").unwrap();
        assert_eq!(profile.backend, "fake_kyiv");
        assert_eq!(profile.payload["p"], 0.01);
        assert!(profile.properties.is_none());
    }

    #[test]
    fn test_noise_provider_failure() {
        let provider = CommandNoiseProvider::new(sh("echo 'no such backend' >&2; exit 1"));
        let err = provider.fetch_profile("missing").unwrap_err();
        assert!(matches!(err, ProviderError::Request(msg) if msg.contains("no such backend")));
    }
}
