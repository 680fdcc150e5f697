mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, project::ProjectSubcommand, task::TaskSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "shipyard",
    about = "Run clone, build and deploy tasks for managed projects and stream their logs",
    version,
    propagate_version = true
)]
struct Cli {
    /// Data root (default: nearest directory containing shipyard.yaml)
    #[arg(long, global = true, env = "SHIPYARD_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create shipyard.yaml and the data directories
    Init,

    /// Start the HTTP API server
    Serve {
        /// Port to listen on (default: server.port from shipyard.yaml)
        #[arg(long)]
        port: Option<u16>,

        /// Open the API root in a browser once listening
        #[arg(long)]
        open: bool,
    },

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Manage project records
    Project {
        #[command(subcommand)]
        subcommand: ProjectSubcommand,
    },

    /// Read task logs
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Serve { port, open } => cmd::serve::run(&root, port, open),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Project { subcommand } => cmd::project::run(&root, subcommand, cli.json),
        Commands::Task { subcommand } => cmd::task::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
