//! Turns project operations into task runs.
//!
//! Every precondition (missing working copy, unknown environment, missing
//! parameter) is checked before a task exists, so a rejected request leaves
//! no registry entry and no log file behind.

use crate::runner::TaskRunner;
use serde::{Deserialize, Serialize};
use shipyard_core::command::{self, CommandLine};
use shipyard_core::config::{Config, EditorInstall};
use shipyard_core::project::{self, Project, ProjectStore};
use shipyard_core::types::{ProjectStatus, TaskId, TaskKind};
use shipyard_core::{Result, ShipyardError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{info, warn};

/// Marker file identifying a Cocos Creator project.
const CREATOR_MARKER: &str = ".creator";

/// One item of a bulk deploy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeployTarget {
    pub id: u64,
    #[serde(default)]
    pub env: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorEngine {
    Creator,
    Egret,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorLaunch {
    pub engine: EditorEngine,
    pub editor: PathBuf,
}

#[derive(Deserialize)]
struct PackageManifest {
    #[serde(default)]
    creator: Option<CreatorSection>,
}

#[derive(Deserialize)]
struct CreatorSection {
    #[serde(default)]
    version: Option<String>,
}

#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<Config>,
    projects: Arc<dyn ProjectStore>,
    runner: TaskRunner,
}

impl Orchestrator {
    pub fn new(config: Arc<Config>, projects: Arc<dyn ProjectStore>, runner: TaskRunner) -> Self {
        Self {
            config,
            projects,
            runner,
        }
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    // -----------------------------------------------------------------------
    // Project store access (blocking file IO)
    // -----------------------------------------------------------------------

    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ProjectStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let projects = self.projects.clone();
        tokio::task::spawn_blocking(move || f(projects.as_ref()))
            .await
            .map_err(|e| ShipyardError::Io(std::io::Error::other(format!("task join error: {e}"))))?
    }

    async fn load(&self, id: u64) -> Result<Project> {
        self.with_store(move |store| store.get(id)).await
    }

    async fn save(&self, mut project: Project) -> Result<Project> {
        project.touch();
        self.with_store(move |store| {
            store.save(&project)?;
            Ok(project)
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Source control
    // -----------------------------------------------------------------------

    /// Clone into `<projects_root>/<title>`. The project record is updated
    /// when the clone starts, not when it finishes.
    pub async fn clone_project(&self, id: u64) -> Result<TaskId> {
        let mut project = self.load(id).await?;
        project::validate_title(&project.title)?;
        let dir = self.config.require_projects_root()?.join(&project.title);
        tokio::fs::create_dir_all(&dir).await?;

        project.local_path = Some(dir.clone());
        project.current_branch = Some(project.default_branch.clone());
        project.status = ProjectStatus::UpToDate;
        let project = self.save(project).await?;

        let task = self
            .runner
            .start(TaskKind::Clone, command::clone(&project.git_url), &dir)
            .await;
        info!(project = %project.title, task_id = %task, "clone started");
        Ok(task)
    }

    pub async fn update_project(&self, id: u64) -> Result<TaskId> {
        let mut project = self.load(id).await?;
        let dir = project.require_working_copy()?.to_path_buf();
        project.status = ProjectStatus::UpToDate;
        let project = self.save(project).await?;

        let task = self
            .runner
            .start(TaskKind::Update, command::update(), &dir)
            .await;
        info!(project = %project.title, task_id = %task, "update started");
        Ok(task)
    }

    /// Fetch then check out `branch`, synchronously. The recorded branch only
    /// changes when both commands succeed.
    pub async fn switch_branch(&self, id: u64, branch: Option<&str>) -> Result<Project> {
        let mut project = self.load(id).await?;
        let branch = branch
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or(ShipyardError::MissingParameter("branch"))?
            .to_string();
        let checkout = command::checkout(&branch)?;
        let dir = project.require_working_copy()?.to_path_buf();

        run_to_completion(&command::fetch(), &dir).await?;
        run_to_completion(&checkout, &dir).await?;

        info!(project = %project.title, branch = %branch, "branch switched");
        project.current_branch = Some(branch);
        self.save(project).await
    }

    // -----------------------------------------------------------------------
    // Build / deploy
    // -----------------------------------------------------------------------

    pub async fn build_project(&self, id: u64) -> Result<TaskId> {
        let project = self.load(id).await?;
        let dir = project.require_working_copy()?;
        let script = project
            .build_script
            .as_deref()
            .or(self.config.default_build_script.as_deref())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ShipyardError::NoBuildScript(project.title.clone()))?;

        let task = self
            .runner
            .start(TaskKind::Build, command::build(script), dir)
            .await;
        info!(project = %project.title, task_id = %task, "build started");
        Ok(task)
    }

    /// Transfer `<output_root>/<code>/<title>` to the environment's destination.
    pub async fn deploy_project(&self, id: u64, env: Option<&str>) -> Result<TaskId> {
        let project = self.load(id).await?;
        let env = env
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(ShipyardError::MissingParameter("env"))?;
        let group = self.config.deploy_group(env)?;
        let output_root = self.config.require_output_root()?;
        // Records are plain YAML and may have been edited by hand.
        project::validate_code(&project.code)?;
        project::validate_title(&project.title)?;
        let src = output_root.join(&project.code).join(&project.title);

        let task = self
            .runner
            .start(TaskKind::Deploy, command::deploy(group, &src), output_root)
            .await;
        info!(project = %project.title, env, task_id = %task, "deploy started");
        Ok(task)
    }

    /// Build each project independently. A failed item never stops the rest.
    pub async fn bulk_build(&self, ids: &[u64]) -> BTreeMap<u64, Result<TaskId>> {
        let mut results = BTreeMap::new();
        for &id in ids {
            if results.contains_key(&id) {
                continue;
            }
            let result = self.build_project(id).await;
            if let Err(e) = &result {
                warn!(project_id = id, error = %e, "bulk build item rejected");
            }
            results.insert(id, result);
        }
        results
    }

    /// Deploy each target independently; a target without its own `env`
    /// uses `default_env`.
    pub async fn bulk_deploy(
        &self,
        targets: &[DeployTarget],
        default_env: Option<&str>,
    ) -> BTreeMap<u64, Result<TaskId>> {
        let mut results = BTreeMap::new();
        for target in merge_targets(targets) {
            let env = target.env.as_deref().or(default_env);
            let result = self.deploy_project(target.id, env).await;
            if let Err(e) = &result {
                warn!(project_id = target.id, error = %e, "bulk deploy item rejected");
            }
            results.insert(target.id, result);
        }
        results
    }

    // -----------------------------------------------------------------------
    // Editor
    // -----------------------------------------------------------------------

    /// Launch the engine editor for the project's working copy, detached.
    pub async fn open_editor(&self, id: u64) -> Result<EditorLaunch> {
        let project = self.load(id).await?;
        let dir = project.require_working_copy()?.to_path_buf();
        let (engine, install) = self.editor_for(&dir).await?;

        let mut child = Command::new(&install.path)
            .arg(&dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                ShipyardError::CommandFailed(format!(
                    "failed to launch editor '{}': {e}",
                    install.path.display()
                ))
            })?;
        // Reap the editor whenever it exits.
        tokio::spawn(async move {
            let _ = child.wait().await;
        });

        info!(project = %project.title, editor = %install.path.display(), "editor launched");
        Ok(EditorLaunch {
            engine,
            editor: install.path.clone(),
        })
    }

    async fn editor_for(&self, dir: &Path) -> Result<(EditorEngine, &EditorInstall)> {
        let editors = &self.config.editor_paths;
        if !tokio::fs::try_exists(dir.join(CREATOR_MARKER)).await? {
            return editors
                .egret
                .as_ref()
                .map(|install| (EditorEngine::Egret, install))
                .ok_or_else(|| ShipyardError::EditorNotFound("no egret editor configured".into()));
        }

        let manifest_path = dir.join("package.json");
        let data = match tokio::fs::read_to_string(&manifest_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ShipyardError::EditorNotFound(format!(
                    "package.json not found in {}",
                    dir.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        let manifest: PackageManifest = serde_json::from_str(&data).map_err(|e| {
            ShipyardError::EditorNotFound(format!("package.json is not readable: {e}"))
        })?;
        let version = manifest
            .creator
            .and_then(|c| c.version)
            .ok_or_else(|| {
                ShipyardError::EditorNotFound("package.json has no creator.version".into())
            })?;
        editors
            .creator_for(&version)
            .map(|install| (EditorEngine::Creator, install))
            .ok_or_else(|| {
                ShipyardError::EditorNotFound(format!("no creator editor for version {version}"))
            })
    }
}

/// Run a short command and wait for it, without a task or log.
async fn run_to_completion(cmd: &CommandLine, cwd: &Path) -> Result<()> {
    let output = Command::new(&cmd.program)
        .args(&cmd.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| ShipyardError::CommandFailed(format!("failed to spawn '{}': {e}", cmd.program)))?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let code = output
        .status
        .code()
        .map_or_else(|| "a signal".to_string(), |c| c.to_string());
    Err(ShipyardError::CommandFailed(format!(
        "`{cmd}` exited with {code}: {}",
        stderr.trim()
    )))
}

/// One entry per project id, in first-seen order. An entry naming its own
/// `env` replaces an earlier entry for the same id that did not.
fn merge_targets(targets: &[DeployTarget]) -> Vec<DeployTarget> {
    let mut merged: Vec<DeployTarget> = Vec::with_capacity(targets.len());
    for target in targets {
        match merged.iter_mut().find(|t| t.id == target.id) {
            Some(existing) if existing.env.is_none() => existing.env = target.env.clone(),
            Some(_) => {}
            None => merged.push(target.clone()),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::BroadcastHub;
    use crate::log_sink::LogSink;
    use crate::registry::TaskRegistry;
    use shipyard_core::config::{DeployGroup, EditorPaths};
    use shipyard_core::project::{NewProject, YamlProjectStore};
    use shipyard_core::types::TaskStatus;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        store: Arc<YamlProjectStore>,
        orch: Orchestrator,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_config(|_| {})
        }

        fn with_config(edit: impl FnOnce(&mut Config)) -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path();
            std::fs::create_dir_all(root.join("out")).unwrap();
            let mut config = Config {
                projects_root: Some(root.join("projects")),
                output_root: Some(root.join("out")),
                default_build_script: Some("echo built".into()),
                ..Config::default()
            };
            config.deploy_groups.insert(
                "staging".into(),
                DeployGroup {
                    tool: "echo".into(),
                    host: "web1".into(),
                    path: "/srv/www".into(),
                },
            );
            edit(&mut config);

            let store = Arc::new(YamlProjectStore::new(root));
            let runner = TaskRunner::new(
                Arc::new(TaskRegistry::new(root.join("logs"), Duration::from_secs(3600))),
                BroadcastHub::new(64),
                LogSink::new(root.join("logs")),
            );
            let orch = Orchestrator::new(Arc::new(config), store.clone(), runner);
            Self { dir, store, orch }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn add(&self, title: &str, git_url: &str) -> Project {
            self.store
                .create(NewProject {
                    title: title.into(),
                    code: "games".into(),
                    git_url: git_url.into(),
                    default_branch: None,
                    build_script: None,
                    auto_clone: false,
                })
                .unwrap()
        }

        /// A project whose working copy is an existing empty directory.
        fn add_local(&self, title: &str) -> Project {
            let mut project = self.add(title, "https://example.com/app.git");
            let wc = self.root().join("wc").join(title);
            std::fs::create_dir_all(&wc).unwrap();
            project.local_path = Some(wc);
            self.store.save(&project).unwrap();
            project
        }

        async fn finish(&self, id: TaskId) -> (TaskStatus, String) {
            let runner = self.orch.runner();
            let task = tokio::time::timeout(Duration::from_secs(30), runner.wait(id))
                .await
                .unwrap()
                .unwrap();
            (task.status, runner.sink().read(id).await.unwrap())
        }

        fn log_files(&self) -> usize {
            std::fs::read_dir(self.root().join("logs"))
                .map(|entries| entries.count())
                .unwrap_or(0)
        }
    }

    fn has_git() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = std::process::Command::new("git")
            .args(["-c", "user.name=shipyard", "-c", "user.email=shipyard@localhost"])
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(status.status.success(), "git {args:?}: {status:?}");
    }

    /// A local repository with one commit on `master` and a `feature` branch.
    fn source_repo(root: &Path) -> PathBuf {
        let src = root.join("source");
        std::fs::create_dir_all(&src).unwrap();
        git(&src, &["init", "-q", "-b", "master"]);
        std::fs::write(src.join("README.md"), "hello\n").unwrap();
        git(&src, &["add", "README.md"]);
        git(&src, &["commit", "-q", "-m", "init"]);
        git(&src, &["branch", "feature"]);
        src
    }

    #[tokio::test]
    async fn clone_creates_working_copy_and_marks_up_to_date() {
        if !has_git() {
            return;
        }
        let fx = Fixture::new();
        let src = source_repo(fx.root());
        let project = fx.add("app", &src.display().to_string());

        let task = fx.orch.clone_project(project.id).await.unwrap();
        let (status, _) = fx.finish(task).await;
        assert_eq!(status, TaskStatus::Succeeded);

        let wc = fx.root().join("projects/app");
        assert!(wc.join("README.md").exists());
        assert!(fx.root().join(format!("logs/{task}.log")).exists());

        let saved = fx.store.get(project.id).unwrap();
        assert_eq!(saved.status, ProjectStatus::UpToDate);
        assert_eq!(saved.local_path.as_deref(), Some(wc.as_path()));
        assert_eq!(saved.current_branch.as_deref(), Some("master"));
    }

    #[tokio::test]
    async fn clone_without_projects_root_creates_no_task() {
        let fx = Fixture::with_config(|c| c.projects_root = None);
        let project = fx.add("app", "https://example.com/app.git");
        let err = fx.orch.clone_project(project.id).await.unwrap_err();
        assert!(matches!(err, ShipyardError::MissingConfig("projects_root")));
        assert!(fx.orch.runner().registry().list().is_empty());
    }

    #[tokio::test]
    async fn clone_directory_failure_creates_no_task() {
        let fx = Fixture::new();
        // projects_root is a file, so the working directory cannot be created.
        std::fs::write(fx.root().join("projects"), "not a dir").unwrap();
        let project = fx.add("app", "https://example.com/app.git");

        let err = fx.orch.clone_project(project.id).await.unwrap_err();
        assert!(matches!(err, ShipyardError::Io(_)));
        assert!(fx.orch.runner().registry().list().is_empty());
        assert_eq!(fx.log_files(), 0);
    }

    #[tokio::test]
    async fn update_requires_working_copy() {
        let fx = Fixture::new();
        let project = fx.add("app", "https://example.com/app.git");
        let err = fx.orch.update_project(project.id).await.unwrap_err();
        assert!(matches!(err, ShipyardError::NotCloned(_)));
        assert!(err.is_precondition());
        assert!(fx.orch.runner().registry().list().is_empty());
        assert_eq!(fx.log_files(), 0);
    }

    #[tokio::test]
    async fn switch_branch_without_branch_creates_nothing() {
        let fx = Fixture::new();
        let project = fx.add_local("app");
        for branch in [None, Some(""), Some("  ")] {
            let err = fx.orch.switch_branch(project.id, branch).await.unwrap_err();
            assert!(matches!(err, ShipyardError::MissingParameter("branch")));
        }
        assert!(fx.orch.runner().registry().list().is_empty());
        assert_eq!(fx.log_files(), 0);
    }

    #[tokio::test]
    async fn switch_branch_rejects_option_like_names() {
        let fx = Fixture::new();
        let project = fx.add_local("app");
        let err = fx
            .orch
            .switch_branch(project.id, Some("--orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShipyardError::InvalidBranch(_)));
    }

    #[tokio::test]
    async fn switch_branch_updates_record_only_on_success() {
        if !has_git() {
            return;
        }
        let fx = Fixture::new();
        let src = source_repo(fx.root());
        let project = fx.add("app", &src.display().to_string());
        let task = fx.orch.clone_project(project.id).await.unwrap();
        assert_eq!(fx.finish(task).await.0, TaskStatus::Succeeded);

        let err = fx
            .orch
            .switch_branch(project.id, Some("no-such-branch"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShipyardError::CommandFailed(_)));
        let unchanged = fx.store.get(project.id).unwrap();
        assert_eq!(unchanged.current_branch.as_deref(), Some("master"));

        let switched = fx
            .orch
            .switch_branch(project.id, Some("feature"))
            .await
            .unwrap();
        assert_eq!(switched.current_branch.as_deref(), Some("feature"));
        assert_eq!(
            fx.store.get(project.id).unwrap().current_branch.as_deref(),
            Some("feature")
        );
        // Synchronous: no task was created for either attempt.
        assert_eq!(fx.orch.runner().registry().list().len(), 1);
    }

    #[tokio::test]
    async fn build_prefers_project_script_over_default() {
        let fx = Fixture::new();
        let mut custom = fx.add_local("custom");
        custom.build_script = Some("echo from-project".into());
        fx.store.save(&custom).unwrap();
        let plain = fx.add_local("plain");

        let task = fx.orch.build_project(custom.id).await.unwrap();
        assert_eq!(
            fx.finish(task).await,
            (TaskStatus::Succeeded, "from-project\n".to_string())
        );

        let task = fx.orch.build_project(plain.id).await.unwrap();
        assert_eq!(
            fx.finish(task).await,
            (TaskStatus::Succeeded, "built\n".to_string())
        );
    }

    #[tokio::test]
    async fn build_without_any_script_is_precondition() {
        let fx = Fixture::with_config(|c| c.default_build_script = None);
        let project = fx.add_local("app");
        let err = fx.orch.build_project(project.id).await.unwrap_err();
        assert!(matches!(err, ShipyardError::NoBuildScript(_)));
        assert!(fx.orch.runner().registry().list().is_empty());
    }

    #[tokio::test]
    async fn deploy_rejects_missing_or_unknown_env() {
        let fx = Fixture::new();
        let project = fx.add("app", "https://example.com/app.git");

        let err = fx.orch.deploy_project(project.id, None).await.unwrap_err();
        assert!(matches!(err, ShipyardError::MissingParameter("env")));
        let err = fx
            .orch
            .deploy_project(project.id, Some("moon"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShipyardError::UnknownEnvironment(_)));
        assert!(fx.orch.runner().registry().list().is_empty());
    }

    #[tokio::test]
    async fn deploy_runs_transfer_tool_against_output_tree() {
        let fx = Fixture::new();
        let project = fx.add("app", "https://example.com/app.git");
        let task = fx
            .orch
            .deploy_project(project.id, Some("staging"))
            .await
            .unwrap();

        let (status, log) = fx.finish(task).await;
        assert_eq!(status, TaskStatus::Succeeded);
        let src = fx.root().join("out/games/app");
        assert_eq!(log, format!("-avz {} web1:/srv/www\n", src.display()));
    }

    #[tokio::test]
    async fn deploy_refuses_code_outside_output_root() {
        let fx = Fixture::new();
        let mut project = fx.add("app", "https://example.com/app.git");
        project.code = "../../etc".into();
        fx.store.save(&project).unwrap();

        let err = fx
            .orch
            .deploy_project(project.id, Some("staging"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShipyardError::InvalidCode(_)));
        assert!(fx.orch.runner().registry().list().is_empty());
        assert_eq!(fx.log_files(), 0);
    }

    #[tokio::test]
    async fn bulk_deploy_isolates_item_failures() {
        let fx = Fixture::new();
        let ids: Vec<u64> = ["one", "two", "three"]
            .iter()
            .map(|t| fx.add(t, "https://example.com/app.git").id)
            .collect();
        let targets = vec![
            DeployTarget { id: ids[0], env: None },
            DeployTarget { id: ids[1], env: Some("moon".into()) },
            DeployTarget { id: ids[2], env: None },
        ];

        let results = fx.orch.bulk_deploy(&targets, Some("staging")).await;
        assert_eq!(results.len(), 3);
        let first = *results[&ids[0]].as_ref().unwrap();
        let third = *results[&ids[2]].as_ref().unwrap();
        assert_ne!(first, third);
        assert!(results[&ids[1]].as_ref().unwrap_err().is_precondition());

        assert_eq!(fx.finish(first).await.0, TaskStatus::Succeeded);
        assert_eq!(fx.finish(third).await.0, TaskStatus::Succeeded);
        assert_eq!(fx.orch.runner().registry().list().len(), 2);
    }

    #[tokio::test]
    async fn bulk_deploy_own_env_wins_over_duplicate_plain_id() {
        let fx = Fixture::new();
        let project = fx.add("app", "https://example.com/app.git");
        let targets = vec![
            DeployTarget { id: project.id, env: None },
            DeployTarget { id: project.id, env: Some("moon".into()) },
        ];

        let results = fx.orch.bulk_deploy(&targets, Some("staging")).await;
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[&project.id],
            Err(ShipyardError::UnknownEnvironment(ref env)) if env == "moon"
        ));
        assert!(fx.orch.runner().registry().list().is_empty());
    }

    #[test]
    fn merge_targets_keeps_first_seen_order() {
        let merged = merge_targets(&[
            DeployTarget { id: 2, env: None },
            DeployTarget { id: 1, env: Some("prod".into()) },
            DeployTarget { id: 2, env: Some("staging".into()) },
            DeployTarget { id: 1, env: Some("moon".into()) },
        ]);
        assert_eq!(
            merged,
            vec![
                DeployTarget { id: 2, env: Some("staging".into()) },
                DeployTarget { id: 1, env: Some("prod".into()) },
            ]
        );
    }

    #[tokio::test]
    async fn bulk_build_reports_each_project() {
        let fx = Fixture::new();
        let cloned = fx.add_local("cloned");
        let bare = fx.add("bare", "https://example.com/app.git");

        let results = fx.orch.bulk_build(&[cloned.id, bare.id, 99]).await;
        assert!(results[&cloned.id].is_ok());
        assert!(matches!(results[&bare.id], Err(ShipyardError::NotCloned(_))));
        assert!(matches!(results[&99], Err(ShipyardError::ProjectNotFound(99))));
    }

    fn editors(creator_version: &str) -> EditorPaths {
        EditorPaths {
            creator: vec![EditorInstall {
                version: Some(creator_version.into()),
                path: PathBuf::from("true"),
            }],
            egret: Some(EditorInstall {
                version: None,
                path: PathBuf::from("true"),
            }),
        }
    }

    #[tokio::test]
    async fn open_editor_matches_creator_version() {
        let fx = Fixture::with_config(|c| c.editor_paths = editors("2.4.3"));
        let project = fx.add_local("app");
        let wc = project.local_path.clone().unwrap();
        std::fs::write(wc.join(CREATOR_MARKER), "").unwrap();
        std::fs::write(
            wc.join("package.json"),
            r#"{"name":"app","creator":{"version":"2.4.3"}}"#,
        )
        .unwrap();

        let launch = fx.orch.open_editor(project.id).await.unwrap();
        assert_eq!(launch.engine, EditorEngine::Creator);
        assert_eq!(launch.editor, PathBuf::from("true"));

        std::fs::write(
            wc.join("package.json"),
            r#"{"creator":{"version":"3.0.0"}}"#,
        )
        .unwrap();
        let err = fx.orch.open_editor(project.id).await.unwrap_err();
        assert!(matches!(err, ShipyardError::EditorNotFound(_)));
    }

    #[tokio::test]
    async fn open_editor_without_manifest_is_precondition() {
        let fx = Fixture::with_config(|c| c.editor_paths = editors("2.4.3"));
        let project = fx.add_local("app");
        let wc = project.local_path.clone().unwrap();
        std::fs::write(wc.join(CREATOR_MARKER), "").unwrap();

        let err = fx.orch.open_editor(project.id).await.unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn open_editor_defaults_to_egret() {
        let fx = Fixture::with_config(|c| c.editor_paths = editors("2.4.3"));
        let project = fx.add_local("app");
        let launch = fx.orch.open_editor(project.id).await.unwrap();
        assert_eq!(launch.engine, EditorEngine::Egret);

        let fx = Fixture::new();
        let project = fx.add_local("app");
        let err = fx.orch.open_editor(project.id).await.unwrap_err();
        assert!(matches!(err, ShipyardError::EditorNotFound(_)));
    }
}
