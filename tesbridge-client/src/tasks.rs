//! Task endpoints

use crate::TesClient;
use crate::error::Result;
use tesbridge_core::domain::operation::Operation;
use tesbridge_core::domain::task::TesTask;
use tesbridge_core::dto::task::CreateTaskResponse;
use tracing::debug;

impl TesClient {
    /// Submit a task description
    ///
    /// # Returns
    /// The identifier the service assigned to the new task
    pub async fn submit(&self, task: &TesTask) -> Result<String> {
        let url = self.tasks_url();
        debug!("POST {} ({})", url, task.name);
        let response = self.client.post(&url).json(task).send().await?;

        let created: CreateTaskResponse = self.handle_response(response).await?;
        Ok(created.id)
    }

    /// Fetch the minimal view of a task: its id and state
    pub async fn fetch_status(&self, task_id: &str) -> Result<Operation> {
        let url = self.task_url(task_id);
        let response = self
            .client
            .get(&url)
            .query(&[("view", "MINIMAL")])
            .send()
            .await?;

        self.handle_response(response).await
    }

    fn tasks_url(&self) -> String {
        format!("{}/v1/tasks", self.base_url)
    }

    fn task_url(&self, task_id: &str) -> String {
        format!("{}/v1/tasks/{}", self.base_url, task_id)
    }
}
