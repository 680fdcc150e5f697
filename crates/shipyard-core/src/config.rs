use crate::error::{Result, ShipyardError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DeployGroup
// ---------------------------------------------------------------------------

/// A named deploy destination: `<tool> -avz <src> <host>:<path>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployGroup {
    #[serde(default = "default_transfer_tool")]
    pub tool: String,
    pub host: String,
    pub path: String,
}

fn default_transfer_tool() -> String {
    "rsync".to_string()
}

impl DeployGroup {
    pub fn destination(&self) -> String {
        format!("{}:{}", self.host, self.path)
    }
}

// ---------------------------------------------------------------------------
// EditorPaths
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorInstall {
    #[serde(default)]
    pub version: Option<String>,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorPaths {
    /// One install per engine version; matched against `creator.version`
    /// in the project's package.json.
    #[serde(default)]
    pub creator: Vec<EditorInstall>,
    #[serde(default)]
    pub egret: Option<EditorInstall>,
}

impl EditorPaths {
    pub fn creator_for(&self, version: &str) -> Option<&EditorInstall> {
        self.creator
            .iter()
            .find(|e| e.version.as_deref() == Some(version))
    }
}

// ---------------------------------------------------------------------------
// TaskSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSettings {
    /// How long a completed task stays in the registry.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Messages a live subscriber may fall behind before it is dropped.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

fn default_retention_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_subscriber_buffer() -> usize {
    256
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3141
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects_root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_directory: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_build_script: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub deploy_groups: BTreeMap<String, DeployGroup>,
    #[serde(default)]
    pub editor_paths: EditorPaths,
    #[serde(default)]
    pub tasks: TaskSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            projects_root: None,
            log_directory: None,
            output_root: None,
            default_build_script: None,
            deploy_groups: BTreeMap::new(),
            editor_paths: EditorPaths::default(),
            tasks: TaskSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(ShipyardError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    pub fn require_projects_root(&self) -> Result<&Path> {
        self.projects_root
            .as_deref()
            .ok_or(ShipyardError::MissingConfig("projects_root"))
    }

    pub fn require_output_root(&self) -> Result<&Path> {
        self.output_root
            .as_deref()
            .ok_or(ShipyardError::MissingConfig("output_root"))
    }

    /// Configured log directory, or `<root>/.shipyard/logs`.
    pub fn log_dir(&self, root: &Path) -> PathBuf {
        match &self.log_directory {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => paths::default_log_dir(root),
        }
    }

    pub fn deploy_group(&self, env: &str) -> Result<&DeployGroup> {
        self.deploy_groups
            .get(env)
            .ok_or_else(|| ShipyardError::UnknownEnvironment(env.to_string()))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        match &self.projects_root {
            None => warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "projects_root is not set: clone is unavailable".to_string(),
            }),
            Some(p) if !p.is_absolute() => warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("projects_root '{}' must be an absolute path", p.display()),
            }),
            Some(_) => {}
        }

        if self.output_root.is_none() && !self.deploy_groups.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "deploy_groups are configured but output_root is not set".to_string(),
            });
        }

        for (env, group) in &self.deploy_groups {
            if group.host.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("deploy group '{env}' has an empty host"),
                });
            }
            if group.path.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("deploy group '{env}' has an empty path"),
                });
            }
            if group.tool.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("deploy group '{env}' has an empty tool"),
                });
            }
        }

        if let Some(script) = &self.default_build_script {
            if script.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: "default_build_script is empty".to_string(),
                });
            }
        }

        for install in &self.editor_paths.creator {
            if install.version.is_none() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "creator editor '{}' has no version and will never be selected",
                        install.path.display()
                    ),
                });
            }
        }

        if self.tasks.subscriber_buffer == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "tasks.subscriber_buffer must be at least 1".to_string(),
            });
        }
        if self.tasks.sweep_interval_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "tasks.sweep_interval_secs must be at least 1".to_string(),
            });
        }

        warnings
    }
}
