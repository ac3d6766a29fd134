//! # monoship
//!
//! Discovers, builds, version-checks and deploys the independently versioned
//! *actions* of a monorepo. An action is a JavaScript workspace package, or a
//! composite or Docker action declared in the workspace manifest. Each action
//! is published to its own destination repository as a commit built through
//! the GitHub git data API; nothing is pushed from the local clone.
//!
//! ## Quick Example
//!
//! ```
//! use monoship::path::{is_within, parse_repository_url};
//!
//! let repo = parse_repository_url("https://github.com/acme/alpha-dest.git").unwrap();
//! assert_eq!(repo.owner, "acme");
//! assert_eq!(repo.name, "alpha-dest");
//!
//! assert!(is_within("pkgs/alpha", "pkgs/alpha/src/index.ts"));
//! assert!(!is_within("pkgs/alpha", "pkgs/alphabet/index.ts"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Actions (`action`)**: the publishable unit, its build contract and
//!   its merged `action.yml` (`schema`).
//! - **Workspace (`workspace`, `package`, `manifest`)**: resolves the
//!   ordered action set from `package.json` workspaces and the manifest.
//! - **Change detection (`git`)**: files touched by the latest commit.
//! - **Remote objects (`remote`, `deploy`)**: the git object model over the
//!   REST API and the deployment protocol built on it.
//! - **Orchestration (`pipeline`)**: sequential batches that keep going
//!   past a failing action and report at the end.
//!
//! ## Execution Flow
//!
//! 1. **Resolve**: build the [`workspace::ActionSet`] once.
//! 2. **Select**: for `deploy` and `check-versions`, keep the actions that
//!    own a file changed by HEAD.
//! 3. **Build**: stage each action into `<output>/<name>`.
//! 4. **Deploy**: commit each staged directory to its destination, and tag.

pub mod action;
pub mod defaults;
pub mod deploy;
pub mod error;
pub mod git;
pub mod manifest;
pub mod output;
pub mod package;
pub mod path;
pub mod pipeline;
pub mod remote;
pub mod schema;
pub mod suggestions;
pub mod workspace;

#[cfg(test)]
mod path_proptest;
