use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SHIPYARD_DIR: &str = ".shipyard";
pub const PROJECTS_DIR: &str = ".shipyard/projects";
pub const LOGS_DIR: &str = ".shipyard/logs";

pub const CONFIG_FILE: &str = "shipyard.yaml";

pub const LOG_EXTENSION: &str = "log";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn shipyard_dir(root: &Path) -> PathBuf {
    root.join(SHIPYARD_DIR)
}

pub fn projects_dir(root: &Path) -> PathBuf {
    root.join(PROJECTS_DIR)
}

pub fn project_record(root: &Path, id: u64) -> PathBuf {
    projects_dir(root).join(format!("{id}.yaml"))
}

pub fn default_log_dir(root: &Path) -> PathBuf {
    root.join(LOGS_DIR)
}

/// Log file for a task: `<log_dir>/<task_id>.log`.
pub fn task_log(log_dir: &Path, task_id: &str) -> PathBuf {
    log_dir.join(format!("{task_id}.{LOG_EXTENSION}"))
}
