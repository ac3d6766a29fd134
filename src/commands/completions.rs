//! # Completions Command Implementation
//!
//! Generates shell completion scripts with `clap_complete`. When run inside
//! a monorepo, the workspace is resolved once and its action names are
//! offered as completions for `merge`; outside one, the script is generated
//! without them.
//!
//! ```bash
//! monoship completions bash > ~/.local/share/bash-completion/completions/monoship
//! monoship completions zsh > ~/.zfunc/_monoship
//! ```

use std::io;

use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::{Args, Command, CommandFactory, ValueEnum};
use clap_complete::{generate, Shell};
use log::debug;

use monoship::defaults;

use super::WorkspaceArgs;
use crate::cli::Cli;

/// Shell types for completion generation
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Shell::Bash,
            CompletionShell::Zsh => Shell::Zsh,
            CompletionShell::Fish => Shell::Fish,
            CompletionShell::PowerShell => Shell::PowerShell,
            CompletionShell::Elvish => Shell::Elvish,
        }
    }
}

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}

/// Execute the `completions` command.
pub fn execute(args: CompletionsArgs, workspace: &WorkspaceArgs) -> Result<()> {
    let names: Vec<String> = match workspace.resolve(defaults::OUTPUT_DIRECTORY.as_ref()) {
        Ok(resolved) => resolved
            .actions
            .names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        Err(e) => {
            debug!("completing without action names: {}", e);
            Vec::new()
        }
    };

    let mut cmd = with_action_names(Cli::command(), names);
    let shell: Shell = args.shell.into();
    generate(shell, &mut cmd, "monoship", &mut io::stdout());
    Ok(())
}

/// Offer `names` as the values of `merge <ACTION>`.
fn with_action_names(cmd: Command, names: Vec<String>) -> Command {
    if names.is_empty() {
        return cmd;
    }
    cmd.mut_subcommand("merge", |merge| {
        merge.mut_arg("action", |arg| {
            arg.value_parser(PossibleValuesParser::new(names))
        })
    })
}
