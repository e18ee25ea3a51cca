//! Tesbridge Runner
//!
//! Runs workflow command-line steps on a remote Task Execution Service.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Repositories: the remote task service seam (create task, get status)
//! - Services: task description building and the per-job lifecycle
//! - Scheduler: polling workers and the registry that tracks them
//!
//! A job is submitted synchronously; after that a background worker polls
//! the service until the task reaches a terminal state, then collects
//! outputs, reports exactly one result to the host and cleans up.

pub mod config;
pub mod error;
pub mod fs;
pub mod repository;
pub mod scheduler;
pub mod service;

pub use config::RunnerConfig;
pub use error::{CollectionError, JobError, TaskBuildError};
pub use fs::{FsAccess, FsError, LocalFsAccess};
pub use repository::TaskService;
pub use scheduler::{PollExit, PollOutcome, PollPolicy, PollWorker, WorkerRegistry};
pub use service::{
    DirectoryListingCollector, JobRunner, OutputCollector, OutputMap, ResultCallback, TaskBuilder,
};
