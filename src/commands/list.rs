//! # List Command Implementation
//!
//! Resolves the workspace and prints one line per action. Read-only.

use anyhow::Result;
use clap::Args;

use monoship::defaults;

use super::WorkspaceArgs;

/// List the actions of the workspace
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Also show kind, version and path
    #[arg(short, long)]
    pub long: bool,
}

/// Execute the `list` command.
pub fn execute(args: ListArgs, workspace: &WorkspaceArgs) -> Result<()> {
    let resolved = workspace.resolve(defaults::OUTPUT_DIRECTORY.as_ref())?;
    resolved.require_actions()?;

    for action in &resolved.actions {
        if args.long {
            println!(
                "{} ({}) {} {} {}",
                action.name(),
                action.repository().slug(),
                action.kind(),
                action.version(),
                action.relative_path().unwrap_or_default()
            );
        } else {
            println!("{} ({})", action.name(), action.repository().slug());
        }
    }
    Ok(())
}
