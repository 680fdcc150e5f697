use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use shipyard_core::types::{TaskId, TaskStatus};
use std::convert::Infallible;

use crate::error::AppError;
use crate::hub::TaskMessage;
use crate::state::AppState;

/// GET /api/tasks/{id}/events: live output of a running task.
///
/// Emits `line` events (`{"seq", "line"}`) and one final `complete` event
/// (`{"completedAt", "status", "exitCode"}`). There is no replay: a task
/// that is not running yields an empty stream, and history comes from
/// `/api/tasks/{id}/log`.
pub async fn task_events(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let task_id: TaskId = id.parse()?;

    // Subscribe before checking status so a completion in between is not missed.
    let subscription = app.hub().subscribe(task_id);
    let subscription = (app.registry().status(task_id) == Some(TaskStatus::Running))
        .then_some(subscription);

    let stream = futures::stream::unfold(subscription, |state| async move {
        let mut sub = state?;
        let (event, next) = match sub.recv().await? {
            TaskMessage::Line(line) => {
                let data = serde_json::to_string(&line).ok()?;
                (Event::default().event("line").data(data), Some(sub))
            }
            TaskMessage::Completed(done) => {
                let data = serde_json::to_string(&done).ok()?;
                (Event::default().event("complete").data(data), None)
            }
        };
        Some((Ok::<Event, Infallible>(event), next))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
