//! Local git access
//!
//! Reads what the deploy pipeline needs from the source monorepo: the files
//! touched by the latest commit, the branch HEAD points at, and the HEAD
//! commit message. Everything goes through the system `git` binary, so any
//! repository layout git understands (worktrees, submodules) works.
//!
//! Nothing here writes to the repository.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// Repo-relative paths touched between HEAD and its first parent.
pub type ChangeSet = BTreeSet<String>;

/// A git working tree on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    /// Open the repository containing `root`.
    pub fn open(root: &Path) -> Result<Self> {
        let repo = Self {
            root: root.to_path_buf(),
        };
        repo.git(&["rev-parse", "--git-dir"])
            .map_err(|_| Error::NotARepository {
                path: root.display().to_string(),
            })?;
        Ok(repo)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full SHA of HEAD.
    pub fn head_commit(&self) -> Result<String> {
        Ok(self.git(&["rev-parse", "--verify", "HEAD"])?.trim().to_string())
    }

    /// Full SHA of the first parent of `commit`.
    pub fn parent_commit(&self, commit: &str) -> Result<String> {
        let parent = format!("{}^1", commit);
        self.git(&["rev-parse", "--verify", "--quiet", &parent])
            .map(|sha| sha.trim().to_string())
            .map_err(|_| Error::NoParentCommit {
                commit: commit.to_string(),
            })
    }

    /// Every file touched by HEAD relative to its first parent.
    ///
    /// Paths are relative to the directory the repository was opened at.
    /// Renames and copies contribute both their old and new path.
    pub fn changed_files(&self) -> Result<ChangeSet> {
        let head = self.head_commit()?;
        let parent = self.parent_commit(&head)?;
        debug!("diffing {}..{}", parent, head);

        let output = self.git(&[
            "diff",
            "--name-status",
            "-z",
            "-M",
            "--relative",
            &parent,
            &head,
        ])?;
        Ok(parse_name_status(&output))
    }

    /// The full reference name HEAD points at, e.g. `refs/heads/main`.
    pub fn head_ref(&self) -> Result<String> {
        self.git(&["symbolic-ref", "--quiet", "HEAD"])
            .map(|name| name.trim().to_string())
            .map_err(|_| Error::DetachedHead)
    }

    /// The HEAD commit message, byte for byte.
    pub fn head_message(&self) -> Result<String> {
        let raw = self.git(&["cat-file", "commit", "HEAD"])?;
        // A commit object is a header block, one blank line, then the message.
        Ok(raw
            .split_once("\n\n")
            .map(|(_, message)| message.to_string())
            .unwrap_or_default())
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let command = format!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| Error::GitCommand {
                command: command.clone(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::GitCommand {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse `git diff --name-status -z` output into a change set.
///
/// Records are NUL-separated: a status token followed by one path, or two
/// paths for renames (`R`) and copies (`C`).
pub fn parse_name_status(output: &str) -> ChangeSet {
    let mut changes = ChangeSet::new();
    let mut tokens = output.split('\0').filter(|t| !t.is_empty());

    while let Some(status) = tokens.next() {
        let paths = if status.starts_with('R') || status.starts_with('C') {
            2
        } else {
            1
        };
        for _ in 0..paths {
            if let Some(path) = tokens.next() {
                changes.insert(path.to_string());
            }
        }
    }

    changes
}
