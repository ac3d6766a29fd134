//! Default values for monoship configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication. Every value here can be
//! overridden by a CLI flag or its environment variable.

use std::time::Duration;

/// Default workspace manifest for non-JavaScript actions, relative to the
/// monorepo root. Overridden by `--workspace` / `MONOSHIP_WORKSPACE`.
pub const WORKSPACE_MANIFEST: &str = "monoship-workspace.yml";

/// Default output root, relative to the monorepo root.
pub const OUTPUT_DIRECTORY: &str = "build";

/// Directory the package build writes into.
pub const DIST_DIRECTORY: &str = "dist";

/// Default package build command. `{name}` is the package name.
pub const BUILD_COMMAND: &str = "pnpm exec nx run {name}:build";

/// Default REST API root. Overridden by `--api-url` / `MONOSHIP_API_URL`.
pub const API_URL: &str = "https://api.github.com";

/// Default per-request timeout for remote API calls, in seconds.
pub const API_TIMEOUT_SECS: u64 = 60;

/// Connect timeout for remote API calls.
pub const API_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Files copied from an action's directory into its output when present.
pub fn auxiliary_files() -> Vec<String> {
    vec!["README.md".to_string()]
}

/// [`BUILD_COMMAND`] split into arguments.
pub fn build_command() -> Vec<String> {
    split_command(BUILD_COMMAND)
}

/// Split a command line on whitespace. Quoting is not interpreted.
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}
