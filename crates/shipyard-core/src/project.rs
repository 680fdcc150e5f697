use crate::error::{Result, ShipyardError};
use crate::paths;
use crate::types::ProjectStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub title: String,
    /// Group code; deploy sources live under `<output_root>/<code>/<title>`.
    pub code: String,
    pub git_url: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub current_branch: Option<String>,
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    #[serde(default)]
    pub build_script: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub auto_clone: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_branch() -> String {
    "master".to_string()
}

/// Fields a caller supplies to register a project.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub title: String,
    pub code: String,
    pub git_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub build_script: Option<String>,
    #[serde(default)]
    pub auto_clone: bool,
}

impl Project {
    /// The local working copy, if the project has one on disk.
    pub fn working_copy(&self) -> Option<&Path> {
        self.local_path.as_deref().filter(|p| p.is_dir())
    }

    /// Like [`Project::working_copy`] but reports absence as a precondition error.
    pub fn require_working_copy(&self) -> Result<&Path> {
        self.working_copy()
            .ok_or_else(|| ShipyardError::NotCloned(self.title.clone()))
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Titles become directory names under the projects root.
pub fn validate_title(title: &str) -> Result<()> {
    if is_path_component(title) {
        Ok(())
    } else {
        Err(ShipyardError::InvalidTitle(title.to_string()))
    }
}

/// Codes name the directory under the output root that deploys read from.
pub fn validate_code(code: &str) -> Result<()> {
    if is_path_component(code) {
        Ok(())
    } else {
        Err(ShipyardError::InvalidCode(code.to_string()))
    }
}

fn is_path_component(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && !s.contains(['/', '\\'])
        && !s.chars().any(char::is_control)
}

// ---------------------------------------------------------------------------
// ProjectStore
// ---------------------------------------------------------------------------

/// Record storage for projects. The engine only needs to read a project and
/// write back status/branch/path changes.
pub trait ProjectStore: Send + Sync {
    fn list(&self) -> Result<Vec<Project>>;
    fn get(&self, id: u64) -> Result<Project>;
    fn create(&self, new: NewProject) -> Result<Project>;
    fn save(&self, project: &Project) -> Result<()>;
}

/// One YAML file per project under `<root>/.shipyard/projects/<id>.yaml`.
pub struct YamlProjectStore {
    root: PathBuf,
    // Serializes id allocation and the title-uniqueness check.
    create_lock: Mutex<()>,
}

impl YamlProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            create_lock: Mutex::new(()),
        }
    }

    fn load_path(path: &Path) -> Result<Project> {
        let data = std::fs::read_to_string(path)?;
        let project: Project = serde_yaml::from_str(&data)?;
        Ok(project)
    }
}

impl ProjectStore for YamlProjectStore {
    fn list(&self) -> Result<Vec<Project>> {
        let dir = paths::projects_dir(&self.root);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut projects = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            projects.push(Self::load_path(&path)?);
        }
        // Newest first.
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(projects)
    }

    fn get(&self, id: u64) -> Result<Project> {
        let path = paths::project_record(&self.root, id);
        if !path.exists() {
            return Err(ShipyardError::ProjectNotFound(id));
        }
        Self::load_path(&path)
    }

    fn create(&self, new: NewProject) -> Result<Project> {
        validate_title(&new.title)?;
        validate_code(&new.code)?;
        let _guard = self
            .create_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let existing = self.list()?;
        if existing.iter().any(|p| p.title == new.title) {
            return Err(ShipyardError::ProjectExists(new.title));
        }
        let id = existing.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let now = Utc::now();
        let project = Project {
            id,
            title: new.title,
            code: new.code,
            git_url: new.git_url,
            default_branch: new.default_branch.unwrap_or_else(default_branch),
            current_branch: None,
            local_path: None,
            build_script: new.build_script,
            status: ProjectStatus::NotCloned,
            auto_clone: new.auto_clone,
            created_at: now,
            updated_at: now,
        };
        self.save(&project)?;
        Ok(project)
    }

    fn save(&self, project: &Project) -> Result<()> {
        let path = paths::project_record(&self.root, project.id);
        let data = serde_yaml::to_string(project)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }
}
