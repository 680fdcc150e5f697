use anyhow::Context;
use shipyard_core::config::Config;
use shipyard_core::{io, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing shipyard in: {}", root.display());

    for dir in [paths::PROJECTS_DIR, paths::LOGS_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    let config = Config {
        projects_root: Some(root.join("projects")),
        ..Config::default()
    };
    let yaml = serde_yaml::to_string(&config)?;
    let written = io::write_if_missing(&paths::config_path(root), yaml.as_bytes())
        .context("failed to write shipyard.yaml")?;
    if written {
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    println!("\nNext: set output_root and deploy_groups in {}", paths::CONFIG_FILE);
    Ok(())
}
