use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/config: the configuration the server was started with.
///
/// Read-only. The file is resolved once at startup; edits to `shipyard.yaml`
/// take effect on restart.
pub async fn get_config(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let json = serde_json::to_value(app.config.as_ref())?;
    Ok(Json(json))
}

/// GET /api/config/validate: warnings for missing or malformed fields.
pub async fn validate_config(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let warnings = app.config.validate();
    Ok(Json(serde_json::json!({ "warnings": warnings })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipyard_core::config::Config;

    #[tokio::test]
    async fn get_config_returns_loaded_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            default_build_script: Some("make".into()),
            ..Config::default()
        };
        let app = AppState::new(dir.path().to_path_buf(), config);
        let json = get_config(State(app)).await.unwrap().0;
        assert_eq!(json["default_build_script"], "make");
        assert_eq!(json["version"], 1);
        assert_eq!(json["tasks"]["retention_secs"], 3600);
    }

    #[tokio::test]
    async fn validate_reports_missing_projects_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = AppState::new(dir.path().to_path_buf(), Config::default());
        let json = validate_config(State(app)).await.unwrap().0;
        let warnings = json["warnings"].as_array().unwrap();
        assert!(warnings
            .iter()
            .any(|w| w["message"].as_str().unwrap().contains("projects_root")));
    }
}
