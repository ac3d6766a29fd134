//! # Merge Command Implementation
//!
//! Prints the merged `action.yml` of one action to stdout, exactly as a
//! build would write it. Nothing is written to disk.

use anyhow::Result;
use clap::Args;

use monoship::defaults;
use monoship::suggestions;

use super::WorkspaceArgs;

/// Print the merged action.yml of one action
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Action name
    pub action: String,
}

/// Execute the `merge` command.
pub fn execute(args: MergeArgs, workspace: &WorkspaceArgs) -> Result<()> {
    let resolved = workspace.resolve(defaults::OUTPUT_DIRECTORY.as_ref())?;

    let action = resolved
        .actions
        .find(&args.action)
        .ok_or_else(|| suggestions::action_not_found(&args.action, &resolved.actions.names()))?;

    let yaml = action.merged_config().map_err(suggestions::explain)?;
    print!("{}", yaml);
    Ok(())
}
