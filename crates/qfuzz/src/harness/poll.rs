//! Cancellable wait for a job to reach a terminal state.
//!
//! The loop queries status, and between queries sleeps on a condition
//! variable for the configured interval. Cancelling the token wakes the
//! sleeper immediately, so a cancelled wait never overstays by a full
//! interval.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::service::{JobStatus, ProviderError};

/// Shared cancellation flag.
///
/// Cloning yields a handle to the same flag; cancelling any handle wakes
/// every waiter.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and wake every waiter.
    pub fn cancel(&self) {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *cancelled = true;
        self.inner.condvar.notify_all();
    }

    /// Whether [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        *self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sleep for up to `timeout`, returning early if cancelled.
    ///
    /// Returns `true` if the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let (guard, _) = self
            .inner
            .condvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard
    }
}

/// Cancellation token plus an optional wait budget.
///
/// The budget is measured from when a harness run starts; the token can be
/// cancelled from another thread at any time.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    /// External cancellation.
    pub token: CancelToken,
    /// Wait budget.
    pub timeout: Option<Duration>,
}

impl Cancellation {
    /// No budget and a fresh token.
    pub fn none() -> Self {
        Self::default()
    }

    /// A budget of `timeout` and a fresh token.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancelToken::new(),
            timeout: Some(timeout),
        }
    }

    /// Budget and token supplied by the caller.
    pub fn new(token: CancelToken, timeout: Option<Duration>) -> Self {
        Self { token, timeout }
    }

    /// Deadline for a run that started at `start`.
    pub fn deadline_from(&self, start: Instant) -> Option<Instant> {
        self.timeout.and_then(|t| start.checked_add(t))
    }
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The job reached `Succeeded` or `Failed`.
    Terminal(JobStatus),
    /// The token was cancelled or the deadline passed first.
    Expired,
}

/// Poll `status` until it reports a terminal state, the token is cancelled,
/// or `deadline` passes.
///
/// Non-terminal states (`Queued`, `Running`) are waited through. At least
/// `interval` separates two status queries.
pub fn wait_for_terminal<F>(
    mut status: F,
    interval: Duration,
    token: &CancelToken,
    deadline: Option<Instant>,
) -> Result<WaitOutcome, ProviderError>
where
    F: FnMut() -> Result<JobStatus, ProviderError>,
{
    let mut last = None;
    loop {
        let current = status()?;
        if last != Some(current) {
            tracing::debug!(status = ?current, "job status");
            last = Some(current);
        }
        if current.is_terminal() {
            return Ok(WaitOutcome::Terminal(current));
        }

        let sleep = match deadline {
            Some(d) => {
                let now = Instant::now();
                if now >= d {
                    return Ok(WaitOutcome::Expired);
                }
                interval.min(d - now)
            }
            None => interval,
        };

        if token.wait_timeout(sleep) {
            return Ok(WaitOutcome::Expired);
        }
    }
}
