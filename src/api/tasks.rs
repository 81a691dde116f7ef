//! Task API endpoints.
//!
//! Task CRUD, search, reordering, scheduling and assistant execution.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::routes::{store_error, AppState};
use super::types::{
    CategoriesResponse, ExecuteResponse, ExecuteStatus, MessageResponse, ReorderRequest,
    ReorderResponse, TasksResponse,
};
use crate::scheduler::ExecutionResult;
use crate::store::{Statistics, StoreError, TaskFilter};
use crate::task::{NewTask, Task, TaskStatus, TaskUpdate};

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Routes mounted under `/api/tasks`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/reorder", post(reorder_tasks))
        .route("/search/:query", get(search_tasks))
        .route("/:id", get(get_task).put(update_task).delete(delete_task))
        .route("/:id/execute", post(execute_task))
        .route("/:id/execute/confirm", post(confirm_execute_task))
}

/// GET /api/tasks - List tasks, optionally filtered by category and status.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<TasksResponse> {
    let tasks = state.tasks.list(&filter).await.map_err(store_error)?;
    Ok(Json(TasksResponse::new(tasks)))
}

/// POST /api/tasks - Create a task and its folder.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewTask>,
) -> ApiResult<Task> {
    let task = state.tasks.create(req).await.map_err(store_error)?;
    tracing::info!("Created task {} ({})", task.title, task.id);
    Ok(Json(task))
}

async fn load_task(state: &AppState, id: &str) -> Result<Task, (StatusCode, String)> {
    state
        .tasks
        .get(id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Task {} not found", id)))
}

/// GET /api/tasks/:id
async fn get_task(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Task> {
    load_task(&state, &id).await.map(Json)
}

/// PUT /api/tasks/:id - Partial update.
async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<TaskUpdate>,
) -> ApiResult<Task> {
    state.tasks.update(&id, update).await.map(Json).map_err(store_error)
}

/// DELETE /api/tasks/:id - Remove a task and its folder.
async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<MessageResponse> {
    if !state.tasks.delete(&id).await.map_err(store_error)? {
        return Err((StatusCode::NOT_FOUND, format!("Task {} not found", id)));
    }
    tracing::info!("Deleted task {}", id);
    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

/// GET /api/tasks/search/:query
async fn search_tasks(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
) -> ApiResult<TasksResponse> {
    let tasks = state.tasks.search(&query).await.map_err(store_error)?;
    Ok(Json(TasksResponse::new(tasks)))
}

/// POST /api/tasks/reorder
async fn reorder_tasks(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<ReorderResponse> {
    if req.task_order.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No task order provided".to_string()));
    }
    state
        .tasks
        .reorder(&req.task_order)
        .await
        .map_err(store_error)?;
    Ok(Json(ReorderResponse { success: true }))
}

/// GET /api/categories
pub(super) async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> ApiResult<CategoriesResponse> {
    let categories = state.tasks.list_categories().await.map_err(store_error)?;
    Ok(Json(CategoriesResponse { categories }))
}

/// GET /api/statistics
pub(super) async fn get_statistics(State(state): State<Arc<AppState>>) -> ApiResult<Statistics> {
    state.tasks.statistics().await.map(Json).map_err(store_error)
}

/// POST /api/schedule - Suggest times for all pending tasks and store them.
pub(super) async fn schedule_tasks(State(state): State<Arc<AppState>>) -> ApiResult<TasksResponse> {
    let filter = TaskFilter {
        status: Some(TaskStatus::Pending),
        ..TaskFilter::default()
    };
    let pending = state.tasks.list(&filter).await.map_err(store_error)?;
    if pending.is_empty() {
        return Ok(Json(TasksResponse {
            tasks: Vec::new(),
            message: Some("No pending tasks to schedule".to_string()),
        }));
    }

    let scheduled = state.scheduler.schedule_tasks(pending).await;

    let mut stored = Vec::with_capacity(scheduled.len());
    for task in scheduled {
        match state
            .tasks
            .update(&task.id, TaskUpdate::suggested_time(task.ai_suggested_time))
            .await
        {
            Ok(updated) => stored.push(updated),
            // Deleted while the assistant was thinking.
            Err(StoreError::NotFound(_)) => {
                tracing::warn!("Task {} disappeared during scheduling", task.id)
            }
            Err(e) => return Err(store_error(e)),
        }
    }

    Ok(Json(TasksResponse::new(stored)))
}

async fn run_and_complete(state: &AppState, task: &Task) -> Result<ExecutionResult, (StatusCode, String)> {
    let result = state.scheduler.execute_task(task).await;
    if result.success {
        match state
            .tasks
            .update(&task.id, TaskUpdate::status(TaskStatus::Completed))
            .await
        {
            Ok(_) | Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(store_error(e)),
        }
    }
    Ok(result)
}

/// POST /api/tasks/:id/execute - Run the task unless it needs permission.
async fn execute_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ExecuteResponse> {
    let task = load_task(&state, &id).await?;
    let requires_permission = state.scheduler.check_execution_permission(&task).await;

    let mut response = ExecuteResponse {
        task_id: task.id.clone(),
        status: ExecuteStatus::AwaitingPermission,
        requires_permission: Some(requires_permission),
        task_folder: Some(task.folder_path.clone()),
        result: None,
        message: None,
    };

    if requires_permission {
        tracing::info!("Task {} awaits permission before execution", task.id);
        response.message = Some(
            "This task requires permission to modify files outside the task folder.".to_string(),
        );
    } else {
        response.result = Some(run_and_complete(&state, &task).await?);
        response.status = ExecuteStatus::Executed;
    }

    Ok(Json(response))
}

/// POST /api/tasks/:id/execute/confirm - Run the task after user approval.
async fn confirm_execute_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ExecuteResponse> {
    let task = load_task(&state, &id).await?;
    let result = run_and_complete(&state, &task).await?;
    Ok(Json(ExecuteResponse {
        task_id: task.id,
        status: ExecuteStatus::Executed,
        requires_permission: None,
        task_folder: None,
        result: Some(result),
        message: None,
    }))
}
