use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shipyard_core::error::ShipyardError;

// ---------------------------------------------------------------------------
// Status mapping
// ---------------------------------------------------------------------------

/// HTTP status for a domain error. Also used for per-item bulk results.
pub fn status_for(err: &ShipyardError) -> StatusCode {
    match err {
        ShipyardError::ProjectNotFound(_)
        | ShipyardError::TaskNotFound(_)
        | ShipyardError::LogNotFound(_) => StatusCode::NOT_FOUND,
        ShipyardError::ProjectExists(_) => StatusCode::CONFLICT,
        ShipyardError::NotInitialized
        | ShipyardError::InvalidTitle(_)
        | ShipyardError::InvalidCode(_)
        | ShipyardError::InvalidTaskId(_)
        | ShipyardError::NotCloned(_)
        | ShipyardError::MissingParameter(_)
        | ShipyardError::InvalidBranch(_)
        | ShipyardError::UnknownEnvironment(_)
        | ShipyardError::MissingConfig(_)
        | ShipyardError::NoBuildScript(_)
        | ShipyardError::EditorNotFound(_) => StatusCode::BAD_REQUEST,
        ShipyardError::CommandFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ShipyardError::Io(_) | ShipyardError::Yaml(_) | ShipyardError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self
            .0
            .downcast_ref::<ShipyardError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %format!("{:#}", self.0), "request failed");
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
