use crate::hub::BroadcastHub;
use crate::log_sink::LogSink;
use crate::orchestrator::Orchestrator;
use crate::registry::TaskRegistry;
use crate::runner::TaskRunner;
use shipyard_core::config::Config;
use shipyard_core::project::{ProjectStore, YamlProjectStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub config: Arc<Config>,
    pub projects: Arc<dyn ProjectStore>,
    pub runner: TaskRunner,
    pub orchestrator: Orchestrator,
}

impl AppState {
    /// Load `shipyard.yaml` from `root` and wire up the engine.
    pub fn load(root: PathBuf) -> shipyard_core::Result<Self> {
        let config = Config::load(&root)?;
        Ok(Self::new(root, config))
    }

    pub fn new(root: PathBuf, config: Config) -> Self {
        let log_dir = config.log_dir(&root);
        let registry = Arc::new(TaskRegistry::new(
            &log_dir,
            Duration::from_secs(config.tasks.retention_secs),
        ));
        let hub = BroadcastHub::new(config.tasks.subscriber_buffer);
        let runner = TaskRunner::new(registry.clone(), hub, LogSink::new(log_dir));

        let config = Arc::new(config);
        let projects: Arc<dyn ProjectStore> = Arc::new(YamlProjectStore::new(&root));
        let orchestrator = Orchestrator::new(config.clone(), projects.clone(), runner.clone());

        // Guard: only spawn if inside a Tokio runtime (skipped in sync unit tests).
        if tokio::runtime::Handle::try_current().is_ok() {
            let interval = Duration::from_secs(config.tasks.sweep_interval_secs.max(1));
            registry.spawn_sweeper(interval);
        }

        Self {
            root,
            config,
            projects,
            runner,
            orchestrator,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        self.runner.registry()
    }

    pub fn hub(&self) -> &BroadcastHub {
        self.runner.hub()
    }

    pub fn logs(&self) -> &LogSink {
        self.runner.sink()
    }
}
