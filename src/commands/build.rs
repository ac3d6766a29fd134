//! # Build Command Implementation
//!
//! Wipes the output root and builds every action of the workspace into it,
//! one after another. A failing action does not stop the others; the
//! command exits non-zero at the end if any failed.

use std::time::Instant;

use anyhow::Result;
use clap::Args;

use monoship::output::{emoji, render_report, OutputConfig};
use monoship::pipeline;
use monoship::suggestions;

use super::{finish, BuildOptions, WorkspaceArgs};

/// Build every action
#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub build: BuildOptions,
}

/// Execute the `build` command.
pub fn execute(args: BuildArgs, workspace: &WorkspaceArgs, color_flag: &str) -> Result<()> {
    let started = Instant::now();
    let out = OutputConfig::from_env_and_flag(color_flag);

    let resolved = workspace.resolve(&args.build.output)?;
    resolved.require_actions()?;

    println!(
        "{} Building {} action(s) into {}",
        emoji(&out, "🔨", "[BUILD]"),
        resolved.actions.len(),
        resolved.output.display()
    );
    pipeline::prepare_output_root(&resolved.output).map_err(suggestions::explain)?;

    let settings = args.build.settings(&resolved.root);
    let report = pipeline::build_actions(&resolved.actions, &settings);

    println!(
        "{}",
        render_report(&out, "built", &report, started.elapsed().as_secs_f64())
    );
    finish(&report, "built")
}
