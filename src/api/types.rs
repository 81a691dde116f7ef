//! API request and response types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::scheduler::ExecutionResult;
use crate::task::{Category, Task};

/// Request body for `POST /api/tasks/reorder`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReorderRequest {
    /// Task ids in their new order. Must not be empty.
    pub task_order: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksResponse {
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TasksResponse {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            message: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteStatus {
    Executed,
    AwaitingPermission,
}

/// Response for the execute and execute/confirm endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub task_id: String,
    pub status: ExecuteStatus,
    /// Only set by the permission-checked endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_permission: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_folder: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
