//! # Deploy Command Implementation
//!
//! Releases the actions touched by the latest commit:
//!
//! 1. Wipe the output root.
//! 2. Diff HEAD against its first parent and select the owning actions.
//! 3. Build each selected action, then commit its output to the action's
//!    destination repository (and tag it with `--push-tags`).
//!
//! Credentials are resolved before anything is built so a misconfigured run
//! fails fast.

use std::time::Instant;

use anyhow::Result;
use clap::Args;
use log::info;

use monoship::deploy::{Deployer, SourceCommit};
use monoship::output::{emoji, render_report, OutputConfig};
use monoship::pipeline;
use monoship::suggestions;

use super::{finish, BuildOptions, RemoteOptions, WorkspaceArgs};

/// Build and deploy changed actions
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Also create the `v<version>` tag; refuses to deploy already tagged versions.
    #[arg(long)]
    pub push_tags: bool,

    #[command(flatten)]
    pub build: BuildOptions,

    #[command(flatten)]
    pub remote: RemoteOptions,
}

/// Execute the `deploy` command.
pub fn execute(args: DeployArgs, workspace: &WorkspaceArgs, color_flag: &str) -> Result<()> {
    let started = Instant::now();
    let out = OutputConfig::from_env_and_flag(color_flag);

    let resolved = workspace.resolve(&args.build.output)?;
    pipeline::prepare_output_root(&resolved.output).map_err(suggestions::explain)?;

    let repository = resolved.repository()?;
    let changes = repository.changed_files().map_err(suggestions::explain)?;
    let selected = resolved.actions.select_changed(&changes);
    info!(
        "{} changed file(s), {} of {} action(s) selected",
        changes.len(),
        selected.len(),
        resolved.actions.len()
    );

    if selected.is_empty() {
        println!("{} No actions changed", emoji(&out, "💤", "[SKIP]"));
        return Ok(());
    }

    let source = SourceCommit::read(&repository).map_err(suggestions::explain)?;
    let client = args.remote.client()?;
    let deployer = Deployer::new(&client, source);

    println!(
        "{} Deploying {} action(s) from {}",
        emoji(&out, "📦", "[DEPLOY]"),
        selected.len(),
        deployer.source().reference
    );

    let settings = args.build.settings(&resolved.root);
    let report = pipeline::deploy_actions(
        selected.iter().copied(),
        &settings,
        &deployer,
        args.push_tags,
    );

    println!(
        "{}",
        render_report(&out, "deployed", &report, started.elapsed().as_secs_f64())
    );
    finish(&report, "deployed")
}
