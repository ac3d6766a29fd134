//! # CLI Command Implementations
//!
//! One file per subcommand, each with an `Args` struct derived with `clap`
//! and an `execute` function. This module holds the argument groups several
//! commands share and the single place the workspace is resolved.
//!
//! Every command resolves the [`ActionSet`] exactly once, up front, and then
//! works from that value.

pub mod build;
pub mod check_versions;
pub mod completions;
pub mod deploy;
pub mod list;
pub mod merge;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use monoship::action::BuildSettings;
use monoship::defaults;
use monoship::git::LocalRepository;
use monoship::path::{normalize_directory, normalize_from_cwd};
use monoship::pipeline::BatchReport;
use monoship::remote::auth::Credentials;
use monoship::remote::github::GitHubClient;
use monoship::suggestions;
use monoship::workspace::{ActionSet, Workspace, WorkspaceProperties};

/// Where the monorepo and its manifest are.
#[derive(Args, Debug, Clone)]
pub struct WorkspaceArgs {
    /// Monorepo root. Defaults to the current directory.
    #[arg(
        short = 'd',
        long,
        global = true,
        value_name = "DIR",
        env = "MONOSHIP_DIRECTORY"
    )]
    pub directory: Option<PathBuf>,

    /// Workspace manifest declaring composite and Docker actions, relative to
    /// the monorepo root.
    #[arg(
        short = 'w',
        long,
        global = true,
        value_name = "FILE",
        env = "MONOSHIP_WORKSPACE",
        default_value = defaults::WORKSPACE_MANIFEST
    )]
    pub workspace: PathBuf,
}

/// A resolved workspace.
#[derive(Debug)]
pub struct Resolved {
    pub root: PathBuf,
    pub output: PathBuf,
    pub manifest: PathBuf,
    pub actions: ActionSet,
}

impl WorkspaceArgs {
    /// Absolute monorepo root.
    pub fn root(&self) -> Result<PathBuf> {
        let directory = self.directory.clone().unwrap_or_else(|| PathBuf::from("."));
        Ok(normalize_from_cwd(&directory)?)
    }

    /// Resolve every action, staging under `output` (relative to the root
    /// unless absolute).
    pub fn resolve(&self, output: &Path) -> Result<Resolved> {
        let root = self.root()?;
        let output = normalize_directory(&root, output);
        let workspace = Workspace::new(WorkspaceProperties {
            working_directory: root.clone(),
            output_directory: output.clone(),
            workspace_manifest: self.workspace.clone(),
        });
        let manifest = workspace.manifest_path();
        let actions = workspace.collect_actions().map_err(suggestions::explain)?;
        log::debug!("resolved {} action(s) in {}", actions.len(), root.display());

        Ok(Resolved {
            root,
            output,
            manifest,
            actions,
        })
    }
}

impl Resolved {
    /// Fail with a hint when the workspace defines nothing.
    pub fn require_actions(&self) -> Result<()> {
        if self.actions.is_empty() {
            return Err(suggestions::no_actions_found(&self.root, &self.manifest));
        }
        Ok(())
    }

    pub fn repository(&self) -> Result<LocalRepository> {
        LocalRepository::open(&self.root).map_err(suggestions::explain)
    }
}

/// Options shared by commands that build.
#[derive(Args, Debug, Clone)]
pub struct BuildOptions {
    /// Output root; each action is staged in a subdirectory named after it.
    #[arg(
        short,
        long,
        value_name = "DIR",
        default_value = defaults::OUTPUT_DIRECTORY
    )]
    pub output: PathBuf,

    /// Package build command; `{name}` is replaced by the package name.
    #[arg(
        long,
        value_name = "COMMAND",
        env = "MONOSHIP_BUILD_COMMAND",
        default_value = defaults::BUILD_COMMAND
    )]
    pub build_command: String,

    /// Extra file copied into every action's output (repeatable).
    #[arg(long = "asset", value_name = "PATH")]
    pub assets: Vec<PathBuf>,
}

impl BuildOptions {
    pub fn settings(&self, root: &Path) -> BuildSettings {
        BuildSettings {
            command: defaults::split_command(&self.build_command),
            assets: self
                .assets
                .iter()
                .map(|asset| normalize_directory(root, asset))
                .collect(),
            ..BuildSettings::default()
        }
    }
}

/// Options shared by commands that talk to the remote API.
#[derive(Args, Debug, Clone)]
pub struct RemoteOptions {
    /// REST API root.
    #[arg(
        long,
        value_name = "URL",
        env = "MONOSHIP_API_URL",
        default_value = defaults::API_URL
    )]
    pub api_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = defaults::API_TIMEOUT_SECS)]
    pub api_timeout: u64,
}

impl RemoteOptions {
    /// Authenticated client from the environment's credentials.
    pub fn client(&self) -> Result<GitHubClient> {
        let timeout = Duration::from_secs(self.api_timeout);
        let token = Credentials::from_env()
            .and_then(|credentials| credentials.resolve_token(&self.api_url, timeout))
            .map_err(suggestions::explain)?;
        Ok(GitHubClient::new(&self.api_url, token, timeout)?)
    }
}

/// Turn a failed batch into a non-zero exit.
pub fn finish(report: &BatchReport, verb: &str) -> Result<()> {
    if report.is_success() {
        return Ok(());
    }
    let names: Vec<&str> = report.failed.iter().map(|f| f.action.as_str()).collect();
    anyhow::bail!(
        "{} of {} action(s) failed to be {}: {}",
        report.failed.len(),
        report.attempted(),
        verb,
        names.join(", ")
    )
}
