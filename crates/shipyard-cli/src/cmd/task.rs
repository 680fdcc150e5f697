use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use shipyard_core::config::Config;
use shipyard_core::types::TaskId;
use shipyard_core::{paths, ShipyardError};
use std::path::Path;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// Print the persisted log of a task
    Log {
        /// Task id as returned by the API
        id: String,
    },
}

pub fn run(root: &Path, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    match subcmd {
        TaskSubcommand::Log { id } => {
            let id: TaskId = id.parse()?;
            let path = paths::task_log(&config.log_dir(root), &id.to_string());
            let text = match std::fs::read_to_string(&path) {
                Ok(t) => t,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(ShipyardError::LogNotFound(id.to_string()).into());
                }
                Err(e) => return Err(e.into()),
            };
            if json {
                print_json(&serde_json::json!({
                    "task_id": id.to_string(),
                    "path": path,
                    "lines": text.lines().collect::<Vec<_>>(),
                }))?;
            } else {
                print!("{text}");
            }
        }
    }
    Ok(())
}
