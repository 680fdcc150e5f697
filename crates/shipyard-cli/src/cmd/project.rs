use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use shipyard_core::config::Config;
use shipyard_core::project::{NewProject, Project, ProjectStore, YamlProjectStore};
use std::path::Path;

#[derive(Subcommand)]
pub enum ProjectSubcommand {
    /// Register a new project
    Add {
        /// Directory name the working copy is cloned into
        title: String,
        /// Short project code
        #[arg(long)]
        code: String,
        /// Remote repository URL
        #[arg(long)]
        git_url: String,
        /// Default branch (default: master)
        #[arg(long)]
        branch: Option<String>,
        /// Shell command run by the build operation
        #[arg(long)]
        build_script: Option<String>,
        #[arg(long)]
        auto_clone: bool,
    },

    /// List projects, newest first
    List,

    /// Show one project record
    Show { id: u64 },
}

pub fn run(root: &Path, subcmd: ProjectSubcommand, json: bool) -> anyhow::Result<()> {
    // Refuse to write records into an uninitialized root.
    Config::load(root).context("failed to load config")?;
    let store = YamlProjectStore::new(root);

    match subcmd {
        ProjectSubcommand::Add {
            title,
            code,
            git_url,
            branch,
            build_script,
            auto_clone,
        } => {
            let project = store.create(NewProject {
                title,
                code,
                git_url,
                default_branch: branch,
                build_script,
                auto_clone,
            })?;
            if json {
                print_json(&project)?;
            } else {
                println!("Created project {} '{}'", project.id, project.title);
            }
        }
        ProjectSubcommand::List => {
            let projects = store.list()?;
            if json {
                print_json(&projects)?;
            } else if projects.is_empty() {
                println!("No projects.");
            } else {
                let rows: Vec<Vec<String>> = projects.iter().map(row).collect();
                print_table(&["ID", "TITLE", "CODE", "STATUS", "BRANCH"], &rows);
            }
        }
        ProjectSubcommand::Show { id } => {
            let project = store.get(id)?;
            if json {
                print_json(&project)?;
            } else {
                show(&project);
            }
        }
    }
    Ok(())
}

fn row(p: &Project) -> Vec<String> {
    vec![
        p.id.to_string(),
        p.title.clone(),
        p.code.clone(),
        p.status.to_string(),
        p.current_branch.clone().unwrap_or_else(|| "-".to_string()),
    ]
}

fn show(p: &Project) {
    println!("Project {}: {}", p.id, p.title);
    println!("  code:     {}", p.code);
    println!("  git url:  {}", p.git_url);
    println!("  default:  {}", p.default_branch);
    println!("  branch:   {}", p.current_branch.as_deref().unwrap_or("-"));
    println!(
        "  path:     {}",
        p.local_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not cloned)".to_string())
    );
    if let Some(script) = &p.build_script {
        println!("  build:    {script}");
    }
    println!("  status:   {}", p.status);
    println!("  updated:  {}", p.updated_at.to_rfc3339());
}
