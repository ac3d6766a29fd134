//! # Workspace Resolution
//!
//! Turns a monorepo on disk into the ordered set of actions a run operates
//! on. Actions come from two places and are concatenated in this order:
//!
//! 1. JavaScript workspace packages, in package discovery order.
//! 2. Entries of the workspace manifest, in file order.
//!
//! A missing manifest contributes nothing; a malformed one, or any action
//! that fails to construct, aborts resolution. There is no partial result.
//!
//! Resolution happens once per command; the resulting [`ActionSet`] is then
//! passed to everything that needs it (selection, building, completions).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use log::debug;

use crate::action::{Action, ActionConfig};
use crate::error::{Error, Result};
use crate::git::ChangeSet;
use crate::manifest;
use crate::package::PackageReader;

/// Inputs for resolving a workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceProperties {
    /// Absolute monorepo root
    pub working_directory: PathBuf,
    /// Absolute output root; each action stages into `<root>/<name>`
    pub output_directory: PathBuf,
    /// Manifest file name, relative to the monorepo root unless absolute
    pub workspace_manifest: PathBuf,
}

/// Resolves the actions of one monorepo.
#[derive(Debug, Clone)]
pub struct Workspace {
    properties: WorkspaceProperties,
    packages: PackageReader,
}

impl Workspace {
    pub fn new(properties: WorkspaceProperties) -> Self {
        let packages = PackageReader::new(properties.working_directory.clone());
        Self {
            properties,
            packages,
        }
    }

    pub fn working_directory(&self) -> &Path {
        &self.properties.working_directory
    }

    /// Absolute path of the workspace manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.properties
            .working_directory
            .join(&self.properties.workspace_manifest)
    }

    /// Resolve every action in the workspace.
    pub fn collect_actions(&self) -> Result<ActionSet> {
        let working_directory = &self.properties.working_directory;
        let output_directory = &self.properties.output_directory;

        let mut actions = Vec::new();

        for package in self.packages.workspaces()? {
            debug!("found workspace package {} at {}", package.name, package.path.display());
            actions.push(Action::new(ActionConfig {
                name: package.name.clone(),
                working_directory: working_directory.clone(),
                output_directory: output_directory.join(staging_name(&package.name)?),
                package_info: Some(package),
                manifest_entry: None,
            })?);
        }

        let manifest_path = self.manifest_path();
        match manifest::read(&manifest_path)? {
            Some(workspace_manifest) => {
                for entry in workspace_manifest.actions {
                    debug!("found manifest action {}", entry.name);
                    actions.push(Action::new(ActionConfig {
                        name: entry.name.clone(),
                        working_directory: working_directory.clone(),
                        output_directory: output_directory.join(staging_name(&entry.name)?),
                        package_info: None,
                        manifest_entry: Some(entry),
                    })?);
                }
            }
            None => debug!("no workspace manifest at {}", manifest_path.display()),
        }

        ActionSet::new(actions)
    }
}

/// The output subdirectory for an action name, always a single path
/// segment: `@scope/name` stages into `scope-name`.
pub fn staging_name(name: &str) -> Result<String> {
    let segment = name.trim_start_matches('@').replace(['/', '\\'], "-");
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(Error::ConfigParse {
            message: format!("action name '{}' cannot name an output directory", name),
            hint: Some("Use a package or manifest name with at least one letter".to_string()),
        });
    }
    Ok(segment)
}

/// The resolved, ordered actions of a workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet {
    actions: Vec<Action>,
}

impl ActionSet {
    /// Wrap resolved actions, rejecting duplicate names and actions that
    /// would stage into the same directory.
    pub fn new(actions: Vec<Action>) -> Result<Self> {
        {
            let mut seen = HashSet::new();
            let mut staged: HashMap<&Path, &str> = HashMap::new();
            for action in &actions {
                if !seen.insert(action.name()) {
                    return Err(Error::ConfigParse {
                        message: format!("duplicate action name '{}'", action.name()),
                        hint: Some(
                            "Action names select the output directory and must be unique"
                                .to_string(),
                        ),
                    });
                }
                if let Some(other) = staged.insert(action.output_directory(), action.name()) {
                    return Err(Error::ConfigParse {
                        message: format!(
                            "actions '{}' and '{}' both stage into {}",
                            other,
                            action.name(),
                            action.output_directory().display()
                        ),
                        hint: Some("Rename one of the actions".to_string()),
                    });
                }
            }
        }
        Ok(Self { actions })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.actions.iter().map(Action::name).collect()
    }

    pub fn find(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|action| action.name() == name)
    }

    /// Actions owning at least one changed file, in resolution order.
    pub fn select_changed(&self, changes: &ChangeSet) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|action| changes.iter().any(|file| action.contains(file)))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ActionSet {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}
