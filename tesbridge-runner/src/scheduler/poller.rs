//! Polling worker
//!
//! Repeatedly fetches a remote snapshot until it is terminal, the retry
//! budget runs out or shutdown is requested, then hands the last snapshot
//! to a completion hook exactly once.
//!
//! The worker knows nothing about TES: callers supply the fetch function,
//! the terminal predicate and the completion hook.

use std::fmt;
use std::future::Future;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{Instrument, Span, debug, info, info_span, warn};

use crate::scheduler::registry::ShutdownSignal;

/// Fixed-interval polling with a budget of failed attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep before every poll
    pub interval: Duration,
    /// Total failed polls tolerated before giving up
    pub retries: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            retries: 10,
        }
    }
}

/// Why a worker stopped polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    Terminal,
    RetriesExhausted,
    Cancelled,
}

/// What the completion hook receives
#[derive(Debug, Clone)]
pub struct PollOutcome<T> {
    /// Last successfully fetched snapshot, or the initial one
    pub snapshot: T,
    pub exit: PollExit,
    /// Fetch attempts made, successful or not
    pub attempts: u32,
    pub failures: u32,
}

/// Immutable identity of the job a worker polls for
#[derive(Debug, Clone)]
pub struct JobIdentity {
    pub name: String,
    pub task_id: String,
    span: Span,
}

impl JobIdentity {
    pub fn new(name: impl Into<String>, task_id: impl Into<String>) -> Self {
        let name = name.into();
        let task_id = task_id.into();
        let span = info_span!("job", name = %name, task_id = %task_id);
        Self {
            name,
            task_id,
            span,
        }
    }

    /// Span every log line of this job is recorded under
    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl fmt::Display for JobIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.task_id)
    }
}

/// Mutable run state, owned by the worker's task only
struct PollState<T> {
    snapshot: T,
    retries_left: u32,
    attempts: u32,
    failures: u32,
}

/// A polling worker for one job
pub struct PollWorker {
    identity: JobIdentity,
    policy: PollPolicy,
    shutdown: ShutdownSignal,
}

impl PollWorker {
    pub fn new(identity: JobIdentity, policy: PollPolicy, shutdown: ShutdownSignal) -> Self {
        Self {
            identity,
            policy,
            shutdown,
        }
    }

    /// Polls until done and returns the outcome
    ///
    /// If `initial` is already done no fetch is made.
    pub async fn run<T, E, F, Fut, D>(
        mut self,
        initial: T,
        mut fetch: F,
        is_done: D,
    ) -> PollOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        D: Fn(&T) -> bool,
    {
        let mut state = PollState {
            snapshot: initial,
            retries_left: self.policy.retries,
            attempts: 0,
            failures: 0,
        };

        let exit = loop {
            if is_done(&state.snapshot) {
                break PollExit::Terminal;
            }

            if self.shutdown.sleep(self.policy.interval).await {
                info!("Shutdown requested, abandoning poll");
                break PollExit::Cancelled;
            }

            state.attempts += 1;
            debug!("Polling (attempt {})", state.attempts);

            match fetch().await {
                Ok(snapshot) => state.snapshot = snapshot,
                Err(e) => {
                    state.failures += 1;
                    state.retries_left = state.retries_left.saturating_sub(1);
                    if state.retries_left == 0 {
                        warn!(
                            "Polling error: {}; max polling retries exceeded after {} failure(s)",
                            e, state.failures
                        );
                        break PollExit::RetriesExhausted;
                    }
                    warn!("Polling error: {} ({} retries left)", e, state.retries_left);
                }
            }
        };

        PollOutcome {
            snapshot: state.snapshot,
            exit,
            attempts: state.attempts,
            failures: state.failures,
        }
    }

    /// Spawns the worker on the runtime
    ///
    /// `complete` runs exactly once after polling stops, inside the job's span.
    pub fn spawn<T, E, F, Fut, D, C, CFut>(
        self,
        initial: T,
        fetch: F,
        is_done: D,
        complete: C,
    ) -> JoinHandle<()>
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send,
        E: fmt::Display + Send + 'static,
        D: Fn(&T) -> bool + Send + 'static,
        C: FnOnce(PollOutcome<T>) -> CFut + Send + 'static,
        CFut: Future<Output = ()> + Send,
    {
        let span = self.identity.span().clone();

        tokio::spawn(
            async move {
                let outcome = self.run(initial, fetch, is_done).await;
                debug!(
                    "Polling stopped ({:?}) after {} attempt(s), {} failed",
                    outcome.exit, outcome.attempts, outcome.failures
                );
                complete(outcome).await;
            }
            .instrument(span),
        )
    }
}
