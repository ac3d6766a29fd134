//! # Batch Orchestration
//!
//! Drives build, deploy and version checks across a list of actions. Actions
//! are processed one at a time in the order given. A failing action is
//! logged, recorded in the [`BatchReport`], and the loop moves on; callers
//! decide the exit status from [`BatchReport::is_success`] once every action
//! has been attempted.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;

use log::{error, info, warn};

use crate::action::{Action, BuildSettings};
use crate::deploy::{self, Deployer};
use crate::error::{Error, ErrorCategory, Result};
use crate::remote::RemoteApi;

/// One action that did not make it.
#[derive(Debug)]
pub struct ActionFailure {
    pub action: String,
    pub error: Error,
}

/// Per-action outcome of a batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<ActionFailure>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no action failed. An empty batch succeeds.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Record the outcome of `operation` on `action`, logging failures.
    pub fn record(&mut self, action: &Action, operation: &str, result: Result<()>) {
        match result {
            Ok(()) => self.succeeded.push(action.name().to_string()),
            Err(e) => {
                match e.category() {
                    ErrorCategory::DuplicateRelease => {
                        warn!("{}: {} skipped: {}", action.name(), operation, e)
                    }
                    _ => error!("{}: {} failed: {}", action.name(), operation, e),
                }
                self.failed.push(ActionFailure {
                    action: action.name().to_string(),
                    error: e,
                });
            }
        }
    }
}

/// Remove `path` if present and create it again, empty.
pub fn prepare_output_root(path: &Path) -> Result<()> {
    let output_error = |e: std::io::Error| Error::OutputDirectory {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    match fs::remove_dir_all(path) {
        Ok(()) => info!("removed previous output {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(output_error(e)),
    }
    fs::create_dir_all(path).map_err(output_error)
}

/// Build every action in order.
pub fn build_actions<'a, I>(actions: I, settings: &BuildSettings) -> BatchReport
where
    I: IntoIterator<Item = &'a Action>,
{
    let mut report = BatchReport::new();
    for action in actions {
        let result = build_one(action, settings);
        report.record(action, "build", result);
    }
    report
}

/// Build and then deploy every action in order. An action whose build
/// fails is not deployed.
pub fn deploy_actions<'a, I>(
    actions: I,
    settings: &BuildSettings,
    deployer: &Deployer<'_>,
    push_tags: bool,
) -> BatchReport
where
    I: IntoIterator<Item = &'a Action>,
{
    let mut report = BatchReport::new();
    for action in actions {
        if let Err(e) = build_one(action, settings) {
            report.record(action, "build", Err(e));
            continue;
        }

        let started = Instant::now();
        info!(
            "{}: deploying {} to {}",
            action.name(),
            action.version(),
            action.repository().slug()
        );
        let result = deployer.deploy(action, push_tags).map(|outcome| {
            info!(
                "{}: deployed commit {}{} in {:.2}s",
                action.name(),
                outcome.commit,
                outcome
                    .tag
                    .map(|t| format!(" tagged {}", t))
                    .unwrap_or_default(),
                started.elapsed().as_secs_f64()
            );
        });
        report.record(action, "deploy", result);
    }
    report
}

/// Check that no action's version is already tagged on its destination.
/// Never writes anything, locally or remotely.
pub fn check_versions<'a, I>(actions: I, remote: &dyn RemoteApi) -> BatchReport
where
    I: IntoIterator<Item = &'a Action>,
{
    let mut report = BatchReport::new();
    for action in actions {
        info!(
            "{}: checking {} on {}",
            action.name(),
            action.tag(),
            action.repository().slug()
        );
        let result = deploy::ensure_untagged(remote, action);
        report.record(action, "version check", result);
    }
    report
}

fn build_one(action: &Action, settings: &BuildSettings) -> Result<()> {
    let started = Instant::now();
    info!("{}: building {} action", action.name(), action.kind());
    action.build(settings)?;
    info!(
        "{}: built in {:.2}s",
        action.name(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
