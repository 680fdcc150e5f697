use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use shipyard_core::project::NewProject;
use shipyard_core::types::TaskId;
use shipyard_core::ShipyardError;
use std::collections::BTreeMap;

use crate::error::{status_for, AppError};
use crate::orchestrator::DeployTarget;
use crate::state::AppState;

fn started(task_id: TaskId) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "task_id": task_id }))
}

/// `{ "<id>": {"task_id": ...} | {"error": ..., "status": ...} }`
fn bulk_results(results: BTreeMap<u64, Result<TaskId, ShipyardError>>) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = results
        .into_iter()
        .map(|(id, result)| {
            let item = match result {
                Ok(task_id) => serde_json::json!({ "task_id": task_id }),
                Err(e) => serde_json::json!({
                    "error": e.to_string(),
                    "status": status_for(&e).as_u16(),
                    "precondition": e.is_precondition(),
                }),
            };
            (id.to_string(), item)
        })
        .collect();
    serde_json::Value::Object(map)
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// GET /api/projects: all projects, newest first.
pub async fn list_projects(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.projects.clone();
    let result = tokio::task::spawn_blocking(move || {
        let projects = store.list()?;
        Ok::<_, ShipyardError>(serde_json::to_value(projects)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// POST /api/projects: register a project.
pub async fn create_project(
    State(app): State<AppState>,
    Json(body): Json<NewProject>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let store = app.projects.clone();
    let result = tokio::task::spawn_blocking(move || {
        let project = store.create(body)?;
        Ok::<_, ShipyardError>(serde_json::to_value(project)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/projects/{id}
pub async fn get_project(
    State(app): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.projects.clone();
    let result = tokio::task::spawn_blocking(move || {
        let project = store.get(id)?;
        Ok::<_, ShipyardError>(serde_json::to_value(project)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// POST /api/projects/{id}/clone
pub async fn clone_project(
    State(app): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let task_id = app.orchestrator.clone_project(id).await?;
    Ok(started(task_id))
}

/// POST /api/projects/{id}/update
pub async fn update_project(
    State(app): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let task_id = app.orchestrator.update_project(id).await?;
    Ok(started(task_id))
}

#[derive(Debug, Default, Deserialize)]
pub struct SwitchBranchBody {
    #[serde(default)]
    pub branch: Option<String>,
}

/// PATCH /api/projects/{id}/switch-branch: fetch and check out, synchronously.
pub async fn switch_branch(
    State(app): State<AppState>,
    Path(id): Path<u64>,
    body: Option<Json<SwitchBranchBody>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let project = app
        .orchestrator
        .switch_branch(id, body.branch.as_deref())
        .await?;
    Ok(Json(serde_json::json!({
        "status": "branch switched",
        "branch": project.current_branch,
    })))
}

/// POST /api/projects/{id}/build
pub async fn build_project(
    State(app): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let task_id = app.orchestrator.build_project(id).await?;
    Ok(started(task_id))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeployBody {
    #[serde(default)]
    pub env: Option<String>,
}

/// POST /api/projects/{id}/deploy
pub async fn deploy_project(
    State(app): State<AppState>,
    Path(id): Path<u64>,
    body: Option<Json<DeployBody>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let task_id = app
        .orchestrator
        .deploy_project(id, body.env.as_deref())
        .await?;
    Ok(started(task_id))
}

/// POST /api/projects/{id}/open: launch the engine editor, detached.
pub async fn open_project(
    State(app): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let launch = app.orchestrator.open_editor(id).await?;
    Ok(Json(serde_json::json!({
        "status": "opened",
        "engine": launch.engine,
        "editor": launch.editor,
    })))
}

// ---------------------------------------------------------------------------
// Bulk
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct BulkBuildBody {
    #[serde(default)]
    pub ids: Vec<u64>,
}

/// POST /api/projects/bulk/build
pub async fn bulk_build(
    State(app): State<AppState>,
    Json(body): Json<BulkBuildBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let results = app.orchestrator.bulk_build(&body.ids).await;
    Ok(Json(bulk_results(results)))
}

/// `ids` share `env`; `targets` may name their own environment.
#[derive(Debug, Deserialize)]
pub struct BulkDeployBody {
    #[serde(default)]
    pub ids: Vec<u64>,
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub targets: Vec<DeployTarget>,
}

/// POST /api/projects/bulk/deploy
pub async fn bulk_deploy(
    State(app): State<AppState>,
    Json(body): Json<BulkDeployBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut targets: Vec<DeployTarget> = body
        .ids
        .iter()
        .map(|&id| DeployTarget { id, env: None })
        .collect();
    targets.extend(body.targets);
    let results = app
        .orchestrator
        .bulk_deploy(&targets, body.env.as_deref())
        .await;
    Ok(Json(bulk_results(results)))
}
