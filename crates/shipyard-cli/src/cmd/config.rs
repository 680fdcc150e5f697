use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use shipyard_core::config::{Config, ConfigWarning, WarnLevel};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the resolved configuration
    Show,

    /// Validate the config and check that external tools are on PATH
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    match subcmd {
        ConfigSubcommand::Show => show(root, &config, json),
        ConfigSubcommand::Validate => validate(&config, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    if json {
        let mut value = serde_json::to_value(config)?;
        value["resolved_log_dir"] = serde_json::json!(config.log_dir(root));
        return print_json(&value);
    }
    print!("{}", serde_yaml::to_string(config)?);
    println!("# logs: {}", config.log_dir(root).display());
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(config: &Config, json: bool) -> anyhow::Result<()> {
    let mut warnings = config.validate();
    warnings.extend(missing_tools(config));

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

/// Executables the server will spawn that cannot be found.
fn missing_tools(config: &Config) -> Vec<ConfigWarning> {
    let mut tools: Vec<(String, String)> = vec![("git".into(), "clone and update".into())];
    for (env, group) in &config.deploy_groups {
        tools.push((group.tool.clone(), format!("deploy group '{env}'")));
    }

    tools
        .into_iter()
        .filter(|(tool, _)| !tool.trim().is_empty() && which::which(tool).is_err())
        .map(|(tool, used_by)| ConfigWarning {
            level: WarnLevel::Warning,
            message: format!("'{tool}' (used by {used_by}) was not found on PATH"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipyard_core::config::DeployGroup;

    #[test]
    fn missing_deploy_tool_is_reported() {
        let mut config = Config::default();
        config.deploy_groups.insert(
            "staging".into(),
            DeployGroup {
                tool: "__no_such_transfer_tool__".into(),
                host: "web1".into(),
                path: "/srv".into(),
            },
        );
        let warnings = missing_tools(&config);
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("__no_such_transfer_tool__")
                && w.message.contains("staging")));
    }
}
