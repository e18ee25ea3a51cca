//! Error types for the runner
//!
//! One enum per failure stage of a job: building the task, talking to the
//! service, and collecting outputs afterwards.

use crate::fs::FsError;
use tesbridge_client::ClientError;
use thiserror::Error;

/// The job specification cannot be turned into a task description
#[derive(Debug, Error)]
pub enum TaskBuildError {
    #[error("job '{0}' has an empty command line")]
    EmptyCommandLine(String),

    #[error("job '{0}' names no container image")]
    MissingImage(String),

    #[error("input binding '{name}' is missing field '{field}'")]
    MissingField { name: String, field: &'static str },

    #[error("input binding '{name}' has a malformed '{field}' field")]
    InvalidField { name: String, field: &'static str },

    #[error("input binding '{name}' has unsupported class '{class}'")]
    UnsupportedClass { name: String, class: String },

    #[error("generated file '{0}' has neither contents nor location")]
    EmptyGeneratedFile(String),

    #[error("failed to materialize '{name}': {source}")]
    Materialize {
        name: String,
        #[source]
        source: FsError,
    },
}

/// Failures that end a job before its polling worker completes normally
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to build task: {0}")]
    TaskBuild(#[from] TaskBuildError),

    /// Creating the task or reading its first snapshot failed
    #[error("failed to submit task: {0}")]
    Submission(#[source] ClientError),

    /// A single status query failed; retried by the worker
    #[error("failed to poll task: {0}")]
    Poll(#[source] ClientError),
}

/// Output collection failures, all reported to the host as `permanentFail`
#[derive(Debug, Error)]
pub enum CollectionError {
    /// A failure the workflow engine recognizes (missing output, bad glob)
    #[error("workflow error: {0}")]
    Workflow(String),

    #[error("unexpected error while collecting outputs: {0:#}")]
    Unexpected(#[from] anyhow::Error),
}
