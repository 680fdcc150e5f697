pub mod error;
pub mod hub;
pub mod log_sink;
pub mod orchestrator;
pub mod registry;
pub mod routes;
pub mod runner;
pub mod state;

use axum::routing::{get, patch, post};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Config
        .route("/api/config", get(routes::config::get_config))
        .route("/api/config/validate", get(routes::config::validate_config))
        // Projects
        .route("/api/projects", get(routes::projects::list_projects))
        .route("/api/projects", post(routes::projects::create_project))
        .route("/api/projects/{id}", get(routes::projects::get_project))
        .route(
            "/api/projects/{id}/clone",
            post(routes::projects::clone_project),
        )
        .route(
            "/api/projects/{id}/update",
            post(routes::projects::update_project),
        )
        .route(
            "/api/projects/{id}/switch-branch",
            patch(routes::projects::switch_branch),
        )
        .route(
            "/api/projects/{id}/build",
            post(routes::projects::build_project),
        )
        .route(
            "/api/projects/{id}/deploy",
            post(routes::projects::deploy_project),
        )
        .route(
            "/api/projects/{id}/open",
            post(routes::projects::open_project),
        )
        .route(
            "/api/projects/bulk/build",
            post(routes::projects::bulk_build),
        )
        .route(
            "/api/projects/bulk/deploy",
            post(routes::projects::bulk_deploy),
        )
        // Tasks
        .route("/api/tasks", get(routes::tasks::list_tasks))
        .route("/api/tasks/{id}", get(routes::tasks::get_task))
        .route("/api/tasks/{id}/log", get(routes::tasks::get_task_log))
        .route("/api/tasks/{id}/events", get(routes::events::task_events))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the API server on `0.0.0.0:<port>`.
pub async fn serve(root: PathBuf, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    serve_on(root, listener).await
}

/// Start the API server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(root: PathBuf, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app_state = state::AppState::load(root)?;
    tracing::info!(
        log_dir = %app_state.logs().dir().display(),
        "shipyard listening on http://localhost:{actual_port}"
    );

    axum::serve(listener, build_router(app_state)).await?;
    Ok(())
}
