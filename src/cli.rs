//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, WorkspaceArgs};

/// monoship - Build and release the actions of a monorepo
#[derive(Parser, Debug)]
#[command(name = "monoship")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    workspace: WorkspaceArgs,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace, or RUST_LOG-style filters)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build every action into the output directory
    Build(commands::build::BuildArgs),

    /// Build and deploy the actions changed by the latest commit
    Deploy(commands::deploy::DeployArgs),

    /// Check that changed actions have not been released yet
    CheckVersions(commands::check_versions::CheckVersionsArgs),

    /// List the actions of the workspace
    List(commands::list::ListArgs),

    /// Print the merged action.yml of one action
    Merge(commands::merge::MergeArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let color = self.color.as_str();
        let workspace = &self.workspace;
        match self.command {
            Commands::Build(args) => commands::build::execute(args, workspace, color),
            Commands::Deploy(args) => commands::deploy::execute(args, workspace, color),
            Commands::CheckVersions(args) => {
                commands::check_versions::execute(args, workspace, color)
            }
            Commands::List(args) => commands::list::execute(args, workspace),
            Commands::Merge(args) => commands::merge::execute(args, workspace),
            Commands::Completions(args) => commands::completions::execute(args, workspace),
        }
    }
}

fn init_logging(filters: &str) {
    // A second initialisation only happens when tests drive the CLI in-process.
    let _ = env_logger::Builder::new()
        .parse_filters(filters)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
