use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use shipyard_core::types::TaskId;
use shipyard_core::ShipyardError;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/tasks: tasks still held by the registry, newest first.
pub async fn list_tasks(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let tasks = app.registry().list();
    Ok(Json(serde_json::to_value(tasks)?))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let task_id: TaskId = id.parse()?;
    let task = app
        .registry()
        .get(task_id)
        .ok_or(ShipyardError::TaskNotFound(id))?;
    Ok(Json(serde_json::to_value(task)?))
}

/// GET /api/tasks/{id}/log: full durable log as plain text. Available while
/// the task runs and after its registry entry has been swept.
pub async fn get_task_log(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let task_id: TaskId = id.parse()?;
    let text = app.logs().read(task_id).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}
