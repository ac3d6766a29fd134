//! In-memory [`RemoteApi`] implementation.
//!
//! Keeps a tiny content-addressed object store per repository so deploy
//! logic can be exercised without a network. SHAs are sequential
//! placeholders, not hashes. Trees are stored flattened as path to bytes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use super::{
    Commit, GitObject, NewCommit, NewTag, ObjectRef, Reference, RemoteApi, Tag, Tree, TreeEntry,
    COMMIT_TYPE,
};
use crate::error::{Error, Result};
use crate::path::RepositoryUrl;

pub type Files = BTreeMap<String, Vec<u8>>;

#[derive(Debug, Default)]
struct RepositoryState {
    refs: BTreeMap<String, String>,
    commits: HashMap<String, Commit>,
    trees: HashMap<String, Files>,
    blobs: HashMap<String, Vec<u8>>,
    tags: HashMap<String, Tag>,
}

#[derive(Debug, Default)]
struct State {
    repositories: HashMap<String, RepositoryState>,
    next_id: u64,
    mutations: usize,
    fail_on: Option<String>,
}

impl State {
    fn next_sha(&mut self) -> String {
        self.next_id += 1;
        format!("{:040x}", self.next_id)
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.fail_on.as_deref() == Some(operation) {
            return Err(Error::Api {
                operation: operation.to_string(),
                status: Some(500),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

/// A set of remote repositories held in memory.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    state: Mutex<State>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `repo` with one root commit on `branch` holding `files`.
    ///
    /// Returns the root commit SHA.
    pub fn add_repository(
        &self,
        repo: &RepositoryUrl,
        branch: &str,
        files: &[(&str, &str)],
    ) -> String {
        let mut state = self.lock();
        let tree_sha = state.next_sha();
        let commit_sha = state.next_sha();
        let repository = state.repositories.entry(repo.slug()).or_default();
        repository.trees.insert(
            tree_sha.clone(),
            files
                .iter()
                .map(|(path, content)| (path.to_string(), content.as_bytes().to_vec()))
                .collect(),
        );
        repository.commits.insert(
            commit_sha.clone(),
            Commit {
                sha: commit_sha.clone(),
                message: "initial commit\n".to_string(),
                tree: ObjectRef { sha: tree_sha },
                parents: Vec::new(),
            },
        );
        repository.refs.insert(branch.to_string(), commit_sha.clone());
        commit_sha
    }

    /// Create a lightweight tag reference directly, bypassing the mutation count.
    pub fn add_tag(&self, repo: &RepositoryUrl, name: &str, sha: &str) {
        let mut state = self.lock();
        state
            .repositories
            .entry(repo.slug())
            .or_default()
            .refs
            .insert(format!("refs/tags/{}", name), sha.to_string());
    }

    /// Point a reference somewhere else, as a concurrent writer would.
    pub fn move_ref(&self, repo: &RepositoryUrl, reference: &str, sha: &str) {
        let mut state = self.lock();
        if let Some(repository) = state.repositories.get_mut(&repo.slug()) {
            repository.refs.insert(reference.to_string(), sha.to_string());
        }
    }

    /// Make every later call of `operation` (e.g. `"create_tag"`) fail.
    pub fn fail_on(&self, operation: &str) {
        self.lock().fail_on = Some(operation.to_string());
    }

    /// Number of write calls that succeeded.
    pub fn mutation_count(&self) -> usize {
        self.lock().mutations
    }

    pub fn ref_sha(&self, repo: &RepositoryUrl, reference: &str) -> Option<String> {
        let state = self.lock();
        state.repositories.get(&repo.slug())?.refs.get(reference).cloned()
    }

    pub fn commit(&self, repo: &RepositoryUrl, sha: &str) -> Option<Commit> {
        let state = self.lock();
        state.repositories.get(&repo.slug())?.commits.get(sha).cloned()
    }

    pub fn tag(&self, repo: &RepositoryUrl, sha: &str) -> Option<Tag> {
        let state = self.lock();
        state.repositories.get(&repo.slug())?.tags.get(sha).cloned()
    }

    /// The flattened file contents of a commit's tree.
    pub fn files_at(&self, repo: &RepositoryUrl, commit_sha: &str) -> Option<Files> {
        let state = self.lock();
        let repository = state.repositories.get(&repo.slug())?;
        let commit = repository.commits.get(commit_sha)?;
        repository.trees.get(&commit.tree.sha).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panic while holding the lock only happens inside a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_repository<T>(
        &self,
        repo: &RepositoryUrl,
        operation: &str,
        mutates: bool,
        f: impl FnOnce(&mut State, &str) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.lock();
        state.check(operation)?;
        let slug = repo.slug();
        if !state.repositories.contains_key(&slug) {
            return Err(Error::Api {
                operation: operation.to_string(),
                status: Some(404),
                message: format!("repository {} not found", slug),
            });
        }
        let value = f(&mut *state, &slug)?;
        if mutates {
            state.mutations += 1;
        }
        Ok(value)
    }
}

fn repository<'a>(state: &'a mut State, slug: &str) -> &'a mut RepositoryState {
    state.repositories.entry(slug.to_string()).or_default()
}

fn not_found(operation: &str, what: &str) -> Error {
    Error::Api {
        operation: operation.to_string(),
        status: Some(404),
        message: format!("{} not found", what),
    }
}

impl RemoteApi for MemoryRemote {
    fn list_tags(&self, repo: &RepositoryUrl) -> Result<Vec<String>> {
        self.with_repository(repo, "list_tags", false, |state, slug| {
            Ok(repository(state, slug)
                .refs
                .keys()
                .filter_map(|name| name.strip_prefix("refs/tags/"))
                .map(str::to_string)
                .collect())
        })
    }

    fn get_ref(&self, repo: &RepositoryUrl, reference: &str) -> Result<Option<Reference>> {
        self.with_repository(repo, "get_ref", false, |state, slug| {
            Ok(repository(state, slug).refs.get(reference).map(|sha| Reference {
                name: reference.to_string(),
                object: GitObject {
                    sha: sha.clone(),
                    object_type: COMMIT_TYPE.to_string(),
                },
            }))
        })
    }

    fn get_commit(&self, repo: &RepositoryUrl, sha: &str) -> Result<Commit> {
        self.with_repository(repo, "get_commit", false, |state, slug| {
            repository(state, slug)
                .commits
                .get(sha)
                .cloned()
                .ok_or_else(|| not_found("get_commit", sha))
        })
    }

    fn create_blob(&self, repo: &RepositoryUrl, content: &[u8]) -> Result<String> {
        self.with_repository(repo, "create_blob", true, |state, slug| {
            let sha = state.next_sha();
            repository(state, slug).blobs.insert(sha.clone(), content.to_vec());
            Ok(sha)
        })
    }

    fn create_tree(
        &self,
        repo: &RepositoryUrl,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<Tree> {
        self.with_repository(repo, "create_tree", true, |state, slug| {
            let sha = state.next_sha();
            let repo_state = repository(state, slug);

            // The base may name a tree or a commit.
            let base_sha = repo_state
                .commits
                .get(base_tree)
                .map(|c| c.tree.sha.clone())
                .unwrap_or_else(|| base_tree.to_string());
            let mut files = repo_state
                .trees
                .get(&base_sha)
                .cloned()
                .ok_or_else(|| not_found("create_tree", base_tree))?;

            for entry in entries {
                let content = match (&entry.content, &entry.sha) {
                    (Some(content), _) => content.as_bytes().to_vec(),
                    (None, Some(blob)) => repo_state
                        .blobs
                        .get(blob)
                        .cloned()
                        .ok_or_else(|| not_found("create_tree", blob))?,
                    (None, None) => {
                        return Err(Error::Api {
                            operation: "create_tree".to_string(),
                            status: Some(422),
                            message: format!("entry {} has neither content nor sha", entry.path),
                        })
                    }
                };
                files.insert(entry.path.clone(), content);
            }

            repo_state.trees.insert(sha.clone(), files);
            Ok(Tree { sha })
        })
    }

    fn create_commit(&self, repo: &RepositoryUrl, commit: &NewCommit) -> Result<Commit> {
        self.with_repository(repo, "create_commit", true, |state, slug| {
            let sha = state.next_sha();
            let repo_state = repository(state, slug);
            if !repo_state.trees.contains_key(&commit.tree) {
                return Err(not_found("create_commit", &commit.tree));
            }
            let created = Commit {
                sha: sha.clone(),
                message: commit.message.clone(),
                tree: ObjectRef {
                    sha: commit.tree.clone(),
                },
                parents: commit
                    .parents
                    .iter()
                    .map(|p| ObjectRef { sha: p.clone() })
                    .collect(),
            };
            repo_state.commits.insert(sha, created.clone());
            Ok(created)
        })
    }

    fn update_ref(
        &self,
        repo: &RepositoryUrl,
        reference: &str,
        sha: &str,
        expected: &str,
    ) -> Result<Reference> {
        self.with_repository(repo, "update_ref", true, |state, slug| {
            let refs = &mut repository(state, slug).refs;
            let current = refs.get(reference).cloned().ok_or_else(|| Error::RefNotFound {
                repository: slug.to_string(),
                reference: reference.to_string(),
            })?;
            if current != expected {
                return Err(Error::RefConflict {
                    reference: reference.to_string(),
                    expected: expected.to_string(),
                    actual: current,
                });
            }
            refs.insert(reference.to_string(), sha.to_string());
            Ok(Reference {
                name: reference.to_string(),
                object: GitObject {
                    sha: sha.to_string(),
                    object_type: COMMIT_TYPE.to_string(),
                },
            })
        })
    }

    fn create_tag(&self, repo: &RepositoryUrl, tag: &NewTag) -> Result<Tag> {
        self.with_repository(repo, "create_tag", true, |state, slug| {
            let sha = state.next_sha();
            let created = Tag {
                sha: sha.clone(),
                tag: tag.tag.clone(),
                message: tag.message.clone(),
                object: GitObject {
                    sha: tag.object.clone(),
                    object_type: tag.object_type.clone(),
                },
            };
            repository(state, slug).tags.insert(sha, created.clone());
            Ok(created)
        })
    }

    fn create_ref(&self, repo: &RepositoryUrl, reference: &str, sha: &str) -> Result<Reference> {
        self.with_repository(repo, "create_ref", true, |state, slug| {
            let refs = &mut repository(state, slug).refs;
            if refs.contains_key(reference) {
                return Err(Error::Api {
                    operation: "create_ref".to_string(),
                    status: Some(422),
                    message: "Reference already exists".to_string(),
                });
            }
            refs.insert(reference.to_string(), sha.to_string());
            Ok(Reference {
                name: reference.to_string(),
                object: GitObject {
                    sha: sha.to_string(),
                    object_type: "tag".to_string(),
                },
            })
        })
    }
}
