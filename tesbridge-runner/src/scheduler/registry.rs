//! Worker registry
//!
//! The pipeline-level set of in-flight polling workers. It only tracks
//! join handles and a shutdown channel; workers share no other state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::{debug, info, warn};

struct TrackedWorker {
    job: String,
    handle: JoinHandle<()>,
}

struct Inner {
    workers: Mutex<Vec<TrackedWorker>>,
    shutdown_tx: broadcast::Sender<()>,
    shutting_down: AtomicBool,
}

/// Tracks polling workers so the host can join or cancel them before exit
///
/// Cloning is cheap and every clone sees the same set.
#[derive(Clone)]
pub struct WorkerRegistry {
    inner: Arc<Inner>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        // Only one shutdown signal is ever sent
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            inner: Arc::new(Inner {
                workers: Mutex::new(Vec::new()),
                shutdown_tx,
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    fn workers(&self) -> MutexGuard<'_, Vec<TrackedWorker>> {
        self.inner
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a started worker to the tracked set
    pub fn register(&self, job: impl Into<String>, handle: JoinHandle<()>) {
        let job = job.into();
        debug!("Registering worker for job {}", job);
        self.workers().push(TrackedWorker { job, handle });
    }

    /// A shutdown signal for a worker about to be spawned
    ///
    /// Workers subscribed after `cancel` start out cancelled.
    pub fn subscribe(&self) -> ShutdownSignal {
        if self.inner.shutting_down.load(Ordering::SeqCst) {
            return ShutdownSignal::Cancelled;
        }
        ShutdownSignal::Listening(self.inner.shutdown_tx.subscribe())
    }

    /// Number of tracked workers that have not finished yet
    pub fn len(&self) -> usize {
        self.workers()
            .iter()
            .filter(|w| !w.handle.is_finished())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the jobs whose workers are still running
    pub fn active_jobs(&self) -> Vec<String> {
        self.workers()
            .iter()
            .filter(|w| !w.handle.is_finished())
            .map(|w| w.job.clone())
            .collect()
    }

    /// Waits for every tracked worker, including ones registered while waiting
    ///
    /// # Returns
    /// The number of workers joined
    pub async fn join_all(&self) -> usize {
        let mut joined = 0;

        loop {
            let batch: Vec<TrackedWorker> = self.workers().drain(..).collect();
            if batch.is_empty() {
                break;
            }

            for worker in batch {
                if let Err(e) = worker.handle.await {
                    warn!("Worker for job {} panicked: {}", worker.job, e);
                }
                joined += 1;
            }
        }

        debug!("Joined {} worker(s)", joined);
        joined
    }

    /// Signals every worker to stop polling, without waiting
    ///
    /// Cancelled workers still run their completion hooks.
    pub fn cancel(&self) {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        // No receivers simply means no worker is sleeping right now
        let _ = self.inner.shutdown_tx.send(());
    }

    /// Cancels all workers and waits for them to finish
    pub async fn shutdown(&self) -> usize {
        info!("Shutting down {} worker(s)", self.len());
        self.cancel();
        self.join_all().await
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-worker view of the registry's shutdown channel
pub enum ShutdownSignal {
    /// Never cancelled; used by workers without a registry
    Never,
    Listening(broadcast::Receiver<()>),
    Cancelled,
}

impl ShutdownSignal {
    pub fn never() -> Self {
        Self::Never
    }

    /// Sleeps for `duration` unless shutdown is requested first
    ///
    /// # Returns
    /// `true` if shutdown was requested
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        let rx = match self {
            ShutdownSignal::Never => {
                time::sleep(duration).await;
                return false;
            }
            ShutdownSignal::Cancelled => return true,
            ShutdownSignal::Listening(rx) => rx,
        };

        let sleep = time::sleep(duration);
        tokio::pin!(sleep);

        let woke = tokio::select! {
            _ = &mut sleep => Wake::Elapsed,
            res = rx.recv() => match res {
                Err(RecvError::Closed) => Wake::Closed,
                Ok(()) | Err(RecvError::Lagged(_)) => Wake::Cancelled,
            },
        };

        match woke {
            Wake::Elapsed => false,
            // Registry dropped: nobody can cancel us any more
            Wake::Closed => {
                *self = ShutdownSignal::Never;
                sleep.await;
                false
            }
            Wake::Cancelled => {
                *self = ShutdownSignal::Cancelled;
                true
            }
        }
    }
}

enum Wake {
    Elapsed,
    Closed,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_all_waits_for_registered_workers() {
        let registry = WorkerRegistry::new();
        let done = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&done);
        registry.register(
            "job-a",
            tokio::spawn(async move {
                time::sleep(Duration::from_millis(20)).await;
                flag.store(true, Ordering::SeqCst);
            }),
        );
        registry.register("job-b", tokio::spawn(async {}));

        assert_eq!(registry.join_all().await, 2);
        assert!(done.load(Ordering::SeqCst));
        assert!(registry.is_empty());
        assert_eq!(registry.join_all().await, 0);
    }

    #[tokio::test]
    async fn test_active_jobs_lists_running_workers() {
        let registry = WorkerRegistry::new();
        let mut signal = registry.subscribe();

        registry.register(
            "sleeper",
            tokio::spawn(async move {
                signal.sleep(Duration::from_secs(3600)).await;
            }),
        );

        assert_eq!(registry.active_jobs(), vec!["sleeper".to_string()]);
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.shutdown().await, 1);
        assert!(registry.active_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_worker_does_not_abort_join() {
        let registry = WorkerRegistry::new();
        registry.register("boom", tokio::spawn(async { panic!("worker failed") }));
        registry.register("fine", tokio::spawn(async {}));

        assert_eq!(registry.join_all().await, 2);
    }

    #[tokio::test]
    async fn test_subscribe_after_cancel_is_already_cancelled() {
        let registry = WorkerRegistry::new();
        registry.cancel();

        let mut signal = registry.subscribe();
        assert!(signal.sleep(Duration::from_secs(3600)).await);
    }

    #[tokio::test]
    async fn test_dropped_registry_does_not_cancel() {
        let registry = WorkerRegistry::new();
        let mut signal = registry.subscribe();
        drop(registry);

        assert!(!signal.sleep(Duration::from_millis(5)).await);
        assert!(!signal.sleep(Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn test_never_signal_just_sleeps() {
        let mut signal = ShutdownSignal::never();
        assert!(!signal.sleep(Duration::from_millis(1)).await);
    }
}
