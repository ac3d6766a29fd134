//! # Deployment Engine
//!
//! Publishes one built action as a commit (and optionally an annotated tag)
//! on the action's destination repository, using only remote API calls.
//!
//! The protocol, per action:
//!
//! 1. Look up the destination reference matching the source branch.
//! 2. With tag pushing, refuse if `v<version>` is already tagged. Nothing
//!    has been written remotely at this point.
//! 3. Walk the output directory into a [`DeploymentUnit`] and create a tree
//!    over the reference's current commit.
//! 4. Create a commit with the source HEAD message and the reference's
//!    commit as its only parent.
//! 5. Move the reference from the SHA read in step 1 to the new commit.
//! 6. With tag pushing, create the tag object and its `refs/tags/` reference.
//!
//! A failure in step 6 leaves the commit from step 5 in place.

use std::fs;
use std::path::Path;

use log::{debug, info};
use walkdir::WalkDir;

use crate::action::Action;
use crate::error::{Error, Result};
use crate::git::LocalRepository;
use crate::path::relative_to;
use crate::remote::{NewCommit, NewTag, RemoteApi, TreeEntry, COMMIT_TYPE};

/// One regular file of a deployment unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentFile {
    /// Path relative to the unit root, `/`-separated
    pub path: String,
    pub content: Vec<u8>,
}

/// Every regular file under an action's output directory, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentUnit {
    files: Vec<DeploymentFile>,
}

impl DeploymentUnit {
    /// Walk `root` recursively. Directories and symlinks are skipped.
    pub fn collect(root: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = relative_to(root, entry.path()).ok_or_else(|| Error::OutputDirectory {
                path: entry.path().display().to_string(),
                message: format!("not below {}", root.display()),
            })?;
            files.push(DeploymentFile {
                path,
                content: fs::read(entry.path())?,
            });
        }
        Ok(Self { files })
    }

    pub fn files(&self) -> &[DeploymentFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Tree entries for this unit. Text goes inline; anything that is not
    /// UTF-8 is uploaded as a blob first.
    fn tree_entries(&self, remote: &dyn RemoteApi, action: &Action) -> Result<Vec<TreeEntry>> {
        self.files
            .iter()
            .map(|file| match std::str::from_utf8(&file.content) {
                Ok(text) => Ok(TreeEntry::inline(&file.path, text)),
                Err(_) => {
                    debug!("{}: uploading binary file {}", action.name(), file.path);
                    let sha = remote.create_blob(action.repository(), &file.content)?;
                    Ok(TreeEntry::blob(&file.path, sha))
                }
            })
            .collect()
    }
}

/// What deployments copy from the source repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCommit {
    /// Full branch reference, e.g. `refs/heads/main`
    pub reference: String,
    /// HEAD commit message, verbatim
    pub message: String,
}

impl SourceCommit {
    pub fn read(repository: &LocalRepository) -> Result<Self> {
        Ok(Self {
            reference: repository.head_ref()?,
            message: repository.head_message()?,
        })
    }
}

/// Result of one successful deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    pub commit: String,
    /// Tag name, when a tag was pushed
    pub tag: Option<String>,
}

/// Whether `v<version>` already exists on the action's destination.
pub fn tag_exists(remote: &dyn RemoteApi, action: &Action) -> Result<bool> {
    let tag = action.tag();
    let tags = remote.list_tags(action.repository())?;
    debug!(
        "{}: {} tags on {}",
        action.name(),
        tags.len(),
        action.repository().slug()
    );
    Ok(tags.iter().any(|t| *t == tag))
}

/// [`tag_exists`], turned into [`Error::TagExists`] when the tag is present.
pub fn ensure_untagged(remote: &dyn RemoteApi, action: &Action) -> Result<()> {
    if tag_exists(remote, action)? {
        return Err(Error::TagExists {
            repository: action.repository().slug(),
            tag: action.tag(),
        });
    }
    Ok(())
}

/// Deploys built actions against one remote.
pub struct Deployer<'a> {
    remote: &'a dyn RemoteApi,
    source: SourceCommit,
}

impl<'a> Deployer<'a> {
    pub fn new(remote: &'a dyn RemoteApi, source: SourceCommit) -> Self {
        Self { remote, source }
    }

    pub fn source(&self) -> &SourceCommit {
        &self.source
    }

    /// Publish `action`'s output directory.
    pub fn deploy(&self, action: &Action, push_tags: bool) -> Result<DeployOutcome> {
        let remote = self.remote;
        let repo = action.repository();
        let reference = &self.source.reference;

        let current = remote
            .get_ref(repo, reference)?
            .ok_or_else(|| Error::RefNotFound {
                repository: repo.slug(),
                reference: reference.clone(),
            })?;
        let expected = current.object.sha;
        debug!("{}: {} is at {}", action.name(), reference, expected);

        if push_tags {
            ensure_untagged(remote, action)?;
        }

        let unit = DeploymentUnit::collect(action.output_directory())?;
        info!(
            "{}: uploading {} files to {}",
            action.name(),
            unit.len(),
            repo.slug()
        );
        let entries = unit.tree_entries(remote, action)?;
        let tree = remote.create_tree(repo, &expected, &entries)?;

        let parent = remote.get_commit(repo, &expected)?;
        let commit = remote.create_commit(
            repo,
            &NewCommit {
                message: self.source.message.clone(),
                tree: tree.sha,
                parents: vec![parent.sha],
            },
        )?;

        remote.update_ref(repo, reference, &commit.sha, &expected)?;
        info!(
            "{}: {} on {} now at {}",
            action.name(),
            reference,
            repo.slug(),
            commit.sha
        );

        let tag = if push_tags {
            Some(self.push_tag(action, &commit.sha)?)
        } else {
            None
        };

        Ok(DeployOutcome {
            commit: commit.sha,
            tag,
        })
    }

    /// Create the annotated tag object for `commit`, then `refs/tags/v<version>`.
    ///
    /// The tag ref points at the tag object, not at the commit; clients peel
    /// it to the commit, and the tag message stays reachable.
    fn push_tag(&self, action: &Action, commit: &str) -> Result<String> {
        let repo = action.repository();
        let name = action.tag();
        let tag = self.remote.create_tag(
            repo,
            &NewTag {
                tag: name.clone(),
                message: format!("Tag for version {}", action.version()),
                object: commit.to_string(),
                object_type: COMMIT_TYPE.to_string(),
            },
        )?;
        self.remote
            .create_ref(repo, &format!("refs/tags/{}", name), &tag.sha)?;
        info!("{}: tagged {} as {}", action.name(), commit, name);
        Ok(name)
    }
}
