//! Path and repository URL helpers for monoship
//!
//! Everything that turns a user-supplied location into something the rest of
//! the crate can compare lives here: directory normalization against the
//! monorepo root, repo-relative paths with `/` separators, separator-anchored
//! membership tests, and splitting a repository URL into owner and name.

use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::error::{Error, Result};

/// Owner and repository name parsed out of a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryUrl {
    pub owner: String,
    pub name: String,
}

impl RepositoryUrl {
    /// `owner/name`, the form the remote API and log lines use.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Parse a repository URL into owner and repository name.
///
/// Accepts `https://host/OWNER/REPO(.git)`, any other `scheme://` URL
/// (`git+https`, `ssh`, `git+ssh`), scp-like `git@host:OWNER/REPO.git`, and
/// the npm shorthands `github:OWNER/REPO` and `OWNER/REPO`. The first two
/// non-empty path segments are used; a single trailing `.git` is stripped
/// from the repository name.
pub fn parse_repository_url(raw: &str) -> Result<RepositoryUrl> {
    let trimmed = raw.trim();
    let invalid = |message: &str| Error::InvalidRepositoryUrl {
        url: raw.to_string(),
        message: message.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("URL is empty"));
    }

    let path = if let Some(rest) = trimmed.strip_prefix("github:") {
        rest.to_string()
    } else if trimmed.contains("://") {
        let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
        url.path().to_string()
    } else if let Some((_, rest)) = trimmed.split_once(':') {
        // scp-like syntax: user@host:owner/repo.git
        rest.to_string()
    } else {
        trimmed.to_string()
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return Err(invalid("expected a path of the form OWNER/REPO"));
    }

    let owner = segments[0];
    let name = segments[1].strip_suffix(".git").unwrap_or(segments[1]);
    if name.is_empty() {
        return Err(invalid("repository name is empty"));
    }

    Ok(RepositoryUrl {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

/// Lexically clean a path: drop `.` components and resolve `..` against
/// preceding normal components. Does not touch the filesystem.
pub fn clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    cleaned.components().next_back(),
                    Some(Component::Normal(_))
                ) && cleaned.pop();
                if !popped && !cleaned.has_root() {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// Resolve `directory` against `base` unless it is already absolute.
///
/// An empty `directory` means `base` itself.
pub fn normalize_directory(base: &Path, directory: &Path) -> PathBuf {
    if directory.as_os_str().is_empty() {
        return clean(base);
    }
    if directory.is_absolute() {
        clean(directory)
    } else {
        clean(&base.join(directory))
    }
}

/// Resolve `directory` against the process working directory.
pub fn normalize_from_cwd(directory: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(normalize_directory(&cwd, directory))
}

/// `path` relative to `base` with `/` separators, or `None` when `path` is
/// not inside `base`. `base` itself yields an empty string.
pub fn relative_to(base: &Path, path: &Path) -> Option<String> {
    let relative = clean(path).strip_prefix(clean(base)).ok()?.to_path_buf();
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// True iff the repo-relative `file` lives under the repo-relative
/// directory `prefix`.
///
/// The match is anchored on a separator so `pkgs/foo` does not claim
/// `pkgs/foobar/index.ts`. An empty prefix (the monorepo root) claims
/// nothing.
pub fn is_within(prefix: &str, file: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    let file = file.replace('\\', "/");
    let file = file.strip_prefix("./").unwrap_or(&file);
    file.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}
