//! # Remote Git Objects
//!
//! Deployment never pushes. Instead it rebuilds a commit on the destination
//! repository through the hosting provider's git data API: blobs and trees
//! first, then a commit, then a reference update, then optionally a tag.
//!
//! This module holds the value types mirroring that object model and the
//! [`RemoteApi`] trait the deploy engine talks to. Two implementations exist:
//!
//! - [`github::GitHubClient`], the REST client used in production.
//! - [`memory::MemoryRemote`], an in-process object store used by tests.
//!
//! Reference names are always full names (`refs/heads/main`,
//! `refs/tags/v1.0.0`). Only references are mutable, and every branch update
//! states the SHA it expects to replace.

pub mod auth;
pub mod github;
pub mod memory;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::path::RepositoryUrl;

/// Mode of a regular, non-executable file.
pub const FILE_MODE: &str = "100644";

/// Object type of file content.
pub const BLOB_TYPE: &str = "blob";

/// Object type a tag points at.
pub const COMMIT_TYPE: &str = "commit";

/// Pointer to an object by SHA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitObject {
    pub sha: String,
    #[serde(rename = "type", default)]
    pub object_type: String,
}

/// A named reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "ref")]
    pub name: String,
    pub object: GitObject,
}

/// One entry of a tree being created.
///
/// Exactly one of `content` (inline UTF-8 text) or `sha` (an existing blob)
/// is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sha: Option<String>,
}

impl TreeEntry {
    /// A regular file with inline content.
    pub fn inline(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: FILE_MODE.to_string(),
            entry_type: BLOB_TYPE.to_string(),
            content: Some(content.into()),
            sha: None,
        }
    }

    /// A regular file whose content is an already uploaded blob.
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: FILE_MODE.to_string(),
            entry_type: BLOB_TYPE.to_string(),
            content: None,
            sha: Some(sha.into()),
        }
    }
}

/// A created tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub sha: String,
}

/// SHA-only pointer used inside commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub sha: String,
}

/// A commit object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    #[serde(default)]
    pub message: String,
    pub tree: ObjectRef,
    #[serde(default)]
    pub parents: Vec<ObjectRef>,
}

/// Request body for a new commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCommit {
    pub message: String,
    pub tree: String,
    pub parents: Vec<String>,
}

/// An annotated tag object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub sha: String,
    pub tag: String,
    #[serde(default)]
    pub message: String,
    pub object: GitObject,
}

/// Request body for a new annotated tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTag {
    pub tag: String,
    pub message: String,
    pub object: String,
    #[serde(rename = "type")]
    pub object_type: String,
}

/// The remote operations deployment and version checks rely on.
pub trait RemoteApi {
    /// Names of every tag in the repository.
    fn list_tags(&self, repo: &RepositoryUrl) -> Result<Vec<String>>;

    /// Look up a reference by full name; `None` when it does not exist.
    fn get_ref(&self, repo: &RepositoryUrl, reference: &str) -> Result<Option<Reference>>;

    /// Fetch a commit object.
    fn get_commit(&self, repo: &RepositoryUrl, sha: &str) -> Result<Commit>;

    /// Upload raw bytes as a blob and return its SHA.
    fn create_blob(&self, repo: &RepositoryUrl, content: &[u8]) -> Result<String>;

    /// Create a tree layered over `base_tree`.
    fn create_tree(
        &self,
        repo: &RepositoryUrl,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<Tree>;

    /// Create a commit object. Does not move any reference.
    fn create_commit(&self, repo: &RepositoryUrl, commit: &NewCommit) -> Result<Commit>;

    /// Move `reference` from `expected` to `sha` without forcing.
    ///
    /// Fails with [`crate::error::Error::RefConflict`] when the reference no
    /// longer points at `expected`.
    fn update_ref(
        &self,
        repo: &RepositoryUrl,
        reference: &str,
        sha: &str,
        expected: &str,
    ) -> Result<Reference>;

    /// Create an annotated tag object. Does not create the tag reference.
    fn create_tag(&self, repo: &RepositoryUrl, tag: &NewTag) -> Result<Tag>;

    /// Create a new reference pointing at `sha`.
    fn create_ref(&self, repo: &RepositoryUrl, reference: &str, sha: &str) -> Result<Reference>;
}
