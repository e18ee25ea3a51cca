//! Job lifecycle controller
//!
//! Orchestrates one job's life:
//! - Build the task description
//! - Submit it and read the first snapshot, synchronously
//! - Spawn and register a polling worker
//! - On completion, collect outputs, report one result to the host, clean up
//!
//! Every job reaches exactly one of `success` or `permanentFail` through the
//! host's result callback, unless it fails to build, in which case `run`
//! returns the error and no callback is made.

use serde_json::Map;
use std::sync::Arc;
use tesbridge_core::domain::job::{JobSpec, JobStatus};
use tesbridge_core::domain::operation::Operation;
use tesbridge_core::domain::task::TesTask;
use tokio::sync::oneshot;
use tracing::{Span, debug, error, info, warn};

use crate::config::RunnerConfig;
use crate::error::{CollectionError, JobError};
use crate::fs::FsAccess;
use crate::repository::TaskService;
use crate::scheduler::{
    JobIdentity, PollExit, PollOutcome, PollPolicy, PollWorker, WorkerRegistry,
};
use crate::service::collector::{OutputCollector, OutputMap};
use crate::service::task_builder::TaskBuilder;

/// Host callback receiving a job's outputs and final status, exactly once
pub type ResultCallback = Box<dyn FnOnce(OutputMap, JobStatus) + Send + 'static>;

/// Runs jobs on a remote Task Execution Service
pub struct JobRunner {
    service: Arc<dyn TaskService>,
    fs: Arc<dyn FsAccess>,
    registry: WorkerRegistry,
    builder: TaskBuilder,
    policy: PollPolicy,
    rm_tmpdir: bool,
    fail_on_remote_error: bool,
}

impl JobRunner {
    pub fn new(
        config: &RunnerConfig,
        service: Arc<dyn TaskService>,
        fs: Arc<dyn FsAccess>,
        registry: WorkerRegistry,
    ) -> Self {
        Self {
            builder: TaskBuilder::new(Arc::clone(&fs), config.docker_workdir.clone()),
            service,
            fs,
            registry,
            policy: config.poll_policy(),
            rm_tmpdir: config.rm_tmpdir,
            fail_on_remote_error: config.fail_on_remote_error,
        }
    }

    pub fn builder(&self) -> &TaskBuilder {
        &self.builder
    }

    /// Starts a job and returns once its polling worker is running
    ///
    /// # Errors
    /// - `JobError::TaskBuild` if the job cannot be described; `on_result`
    ///   is not called
    /// - `JobError::Submission` if the task cannot be created or its first
    ///   snapshot read; `on_result` has already been called with
    ///   `permanentFail`
    pub async fn run(
        &self,
        job: JobSpec,
        collector: Arc<dyn OutputCollector>,
        on_result: ResultCallback,
    ) -> Result<(), JobError> {
        let task = self.builder.build(&job)?;
        debug!(
            "[job {}] Created task: {}",
            job.name,
            serde_json::to_string(&task).unwrap_or_default()
        );

        let operation = match self.submit(&task).await {
            Ok(operation) => operation,
            Err(e) => {
                error!("[job {}] Failed to submit task to TES service: {}", job.name, e);
                on_result(Map::new(), JobStatus::PermanentFail);
                cleanup(Arc::clone(&self.fs), &job, self.rm_tmpdir).await;
                return Err(e);
            }
        };

        let identity = JobIdentity::new(&job.name, &operation.id);
        identity.span().in_scope(|| {
            info!("Submitted task, initial state {:?}", operation.state);
        });

        let task_id = operation.id.clone();
        let service = Arc::clone(&self.service);
        let fetch = move || {
            let service = Arc::clone(&service);
            let task_id = task_id.clone();
            async move { service.get_task(&task_id).await.map_err(JobError::Poll) }
        };

        let completion = JobCompletion {
            job,
            fs: Arc::clone(&self.fs),
            collector,
            on_result,
            rm_tmpdir: self.rm_tmpdir,
            fail_on_remote_error: self.fail_on_remote_error,
        };

        let name = identity.name.clone();
        let worker = PollWorker::new(identity, self.policy, self.registry.subscribe());
        let handle = worker.spawn(operation, fetch, Operation::is_terminal, move |outcome| {
            completion.finish(outcome)
        });
        self.registry.register(name, handle);

        Ok(())
    }

    /// Runs `job` and waits for its result
    ///
    /// Only a job that cannot be described is an error. A failed submission
    /// is reported as `permanentFail` like any other failed job. Cleanup may
    /// still be in flight on return; join the registry to wait for it.
    pub async fn run_and_wait(
        &self,
        job: JobSpec,
        collector: Arc<dyn OutputCollector>,
    ) -> Result<(OutputMap, JobStatus), JobError> {
        let name = job.name.clone();
        let (result_tx, result_rx) = oneshot::channel();
        let on_result: ResultCallback = Box::new(move |outputs, status| {
            let _ = result_tx.send((outputs, status));
        });

        match self.run(job, collector, on_result).await {
            // already reported through the callback
            Ok(()) | Err(JobError::Submission(_)) => {}
            Err(e) => return Err(e),
        }

        Ok(result_rx.await.unwrap_or_else(|_| {
            error!("[job {}] Worker exited without reporting a result", name);
            (Map::new(), JobStatus::PermanentFail)
        }))
    }

    /// Creates the task and reads its first snapshot
    async fn submit(&self, task: &TesTask) -> Result<Operation, JobError> {
        let task_id = self
            .service
            .create_task(task)
            .await
            .map_err(JobError::Submission)?;
        debug!("[job {}] Submitted task {}", task.name, task_id);

        self.service
            .get_task(&task_id)
            .await
            .map_err(JobError::Submission)
    }
}

/// Everything the completion hook needs, moved into the worker
struct JobCompletion {
    job: JobSpec,
    fs: Arc<dyn FsAccess>,
    collector: Arc<dyn OutputCollector>,
    on_result: ResultCallback,
    rm_tmpdir: bool,
    fail_on_remote_error: bool,
}

impl JobCompletion {
    async fn finish(self, outcome: PollOutcome<Operation>) {
        info!(
            "Task finished polling ({:?}) in state {:?}",
            outcome.exit, outcome.snapshot.state
        );

        let (outputs, status) = if self.fail_on_remote_error && remote_failed(&outcome) {
            warn!("Remote task did not complete, skipping output collection");
            (Map::new(), JobStatus::PermanentFail)
        } else {
            collect_outputs(Arc::clone(&self.collector), self.job.outdir.clone()).await
        };

        if status == JobStatus::Success {
            debug!(
                "Outputs: {}",
                serde_json::to_string(&outputs).unwrap_or_default()
            );
        }
        info!("Job finished with status {}", status);
        (self.on_result)(outputs, status);

        cleanup(self.fs, &self.job, self.rm_tmpdir).await;
    }
}

/// Whether the worker stopped anywhere other than `COMPLETE`
fn remote_failed(outcome: &PollOutcome<Operation>) -> bool {
    outcome.exit != PollExit::Terminal
        || outcome.snapshot.state.is_some_and(|s| s.is_failure())
}

/// Runs the host collector on the blocking pool; any failure, including a
/// panic, becomes `permanentFail`
async fn collect_outputs(
    collector: Arc<dyn OutputCollector>,
    outdir: String,
) -> (OutputMap, JobStatus) {
    let span = Span::current();
    let collected =
        tokio::task::spawn_blocking(move || span.in_scope(|| collector.collect(&outdir))).await;

    match collected {
        Ok(Ok(outputs)) => (outputs, JobStatus::Success),
        Ok(Err(CollectionError::Workflow(msg))) => {
            error!("Job error: {}", msg);
            (Map::new(), JobStatus::PermanentFail)
        }
        Ok(Err(e)) => {
            error!("Exception while collecting outputs: {}", e);
            (Map::new(), JobStatus::PermanentFail)
        }
        Err(e) => {
            error!("Output collection panicked: {}", e);
            (Map::new(), JobStatus::PermanentFail)
        }
    }
}

/// Best-effort removal of the staging and temporary directories, on the
/// blocking pool
async fn cleanup(fs: Arc<dyn FsAccess>, job: &JobSpec, rm_tmpdir: bool) {
    let span = Span::current();
    let stagedir = job.stagedir.clone();
    let tmpdir = rm_tmpdir.then(|| job.tmpdir.clone());

    let removed = tokio::task::spawn_blocking(move || {
        span.in_scope(|| remove_job_dirs(fs.as_ref(), stagedir.as_deref(), tmpdir.as_deref()))
    })
    .await;

    if let Err(e) = removed {
        warn!("Clean up panicked: {}", e);
    }
}

fn remove_job_dirs(fs: &dyn FsAccess, stagedir: Option<&str>, tmpdir: Option<&str>) {
    debug!("Starting clean up");

    if let Some(stagedir) = stagedir {
        if fs.exists(stagedir) {
            debug!("Removing input staging directory {}", stagedir);
            if let Err(e) = fs.remove_tree(stagedir) {
                warn!("Failed to remove staging directory: {}", e);
            }
        }
    }

    if let Some(tmpdir) = tmpdir {
        debug!("Removing temporary directory {}", tmpdir);
        if let Err(e) = fs.remove_tree(tmpdir) {
            warn!("Failed to remove temporary directory: {}", e);
        }
    }
}
