//! Tasks repository
//!
//! Handles the two calls a job makes against the Task Execution Service:
//! - Creating a task from a description
//! - Fetching the latest snapshot of a task

use async_trait::async_trait;
use tesbridge_client::{ClientError, TesClient};
use tesbridge_core::domain::operation::Operation;
use tesbridge_core::domain::task::TesTask;

/// Repository trait for task operations on the remote service
///
/// Implementations must be stateless per call; many workers share one.
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Creates a task and returns the identifier the service assigned
    async fn create_task(&self, task: &TesTask) -> Result<String, ClientError>;

    /// Fetches the minimal view of a task
    async fn get_task(&self, task_id: &str) -> Result<Operation, ClientError>;
}

#[async_trait]
impl TaskService for TesClient {
    async fn create_task(&self, task: &TesTask) -> Result<String, ClientError> {
        self.submit(task).await
    }

    async fn get_task(&self, task_id: &str) -> Result<Operation, ClientError> {
        self.fetch_status(task_id).await
    }
}
