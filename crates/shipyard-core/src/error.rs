use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShipyardError {
    #[error("not initialized: run 'shipyard init'")]
    NotInitialized,

    #[error("project not found: {0}")]
    ProjectNotFound(u64),

    #[error("project already exists: {0}")]
    ProjectExists(String),

    #[error("invalid project title '{0}': must be a single path component")]
    InvalidTitle(String),

    #[error("invalid project code '{0}': must be a single path component")]
    InvalidCode(String),

    #[error("project '{0}' is not cloned locally")]
    NotCloned(String),

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid branch name '{0}'")]
    InvalidBranch(String),

    #[error("invalid deploy environment: {0}")]
    UnknownEnvironment(String),

    #[error("configuration field '{0}' is not set")]
    MissingConfig(&'static str),

    #[error("no build script configured for project '{0}'")]
    NoBuildScript(String),

    #[error("no editor found: {0}")]
    EditorNotFound(String),

    #[error("invalid task id '{0}'")]
    InvalidTaskId(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("log not found for task {0}")]
    LogNotFound(String),

    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ShipyardError {
    /// Errors the caller can fix by changing the request or the configuration.
    /// These are reported synchronously and never create a task.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ShipyardError::NotCloned(_)
                | ShipyardError::MissingParameter(_)
                | ShipyardError::InvalidBranch(_)
                | ShipyardError::UnknownEnvironment(_)
                | ShipyardError::MissingConfig(_)
                | ShipyardError::NoBuildScript(_)
                | ShipyardError::EditorNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ShipyardError>;
