//! Task DTOs

use serde::{Deserialize, Serialize};

/// Body returned by `POST /v1/tasks`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    pub id: String,
}
