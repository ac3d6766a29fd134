//! # Check-Versions Command Implementation
//!
//! Verifies, for every action changed by the latest commit, that its
//! `v<version>` tag does not exist on the destination yet. Read-only: the
//! output root and the remote repositories are left alone.

use std::time::Instant;

use anyhow::Result;
use clap::Args;

use monoship::output::{emoji, render_report, OutputConfig};
use monoship::pipeline;
use monoship::suggestions;

use super::{finish, RemoteOptions, WorkspaceArgs};

/// Check that changed actions have unreleased versions
#[derive(Args, Debug)]
pub struct CheckVersionsArgs {
    #[command(flatten)]
    pub remote: RemoteOptions,
}

/// Execute the `check-versions` command.
pub fn execute(
    args: CheckVersionsArgs,
    workspace: &WorkspaceArgs,
    color_flag: &str,
) -> Result<()> {
    let started = Instant::now();
    let out = OutputConfig::from_env_and_flag(color_flag);

    let resolved = workspace.resolve(monoship::defaults::OUTPUT_DIRECTORY.as_ref())?;
    let changes = resolved
        .repository()?
        .changed_files()
        .map_err(suggestions::explain)?;
    let selected = resolved.actions.select_changed(&changes);

    if selected.is_empty() {
        println!("{} No actions changed", emoji(&out, "💤", "[SKIP]"));
        return Ok(());
    }

    let client = args.remote.client()?;
    let report = pipeline::check_versions(selected.iter().copied(), &client);

    println!(
        "{}",
        render_report(&out, "checked", &report, started.elapsed().as_secs_f64())
    );
    finish(&report, "checked")
}
