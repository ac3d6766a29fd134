//! # Package Metadata
//!
//! Reads the JavaScript side of the workspace: the root `package.json`, the
//! workspace member patterns it declares (or that `pnpm-workspace.yaml`
//! declares), and each member's `package.json`.
//!
//! Member discovery order is stable: patterns are processed in declaration
//! order, each pattern's matches are sorted, and a directory matched by more
//! than one pattern keeps its first position.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::path::{clean, relative_to};

/// File name of the package metadata document.
pub const PACKAGE_FILE: &str = "package.json";

/// File name of the pnpm workspace declaration.
pub const PNPM_WORKSPACE_FILE: &str = "pnpm-workspace.yaml";

/// Metadata for one workspace package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    /// Package name as published (`@scope/name` allowed)
    pub name: String,
    /// Package version; empty when the manifest has none
    pub version: String,
    /// Absolute package directory
    pub path: PathBuf,
    /// `repository` field, normalized to a URL string
    pub repository_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PackageJson {
    name: Option<String>,
    version: Option<String>,
    repository: Option<RepositoryField>,
    workspaces: Option<WorkspacesField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RepositoryField {
    Url(String),
    Object { url: Option<String> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkspacesField {
    List(Vec<String>),
    Object {
        #[serde(default)]
        packages: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
struct PnpmWorkspace {
    #[serde(default)]
    packages: Vec<String>,
}

/// Reads package metadata beneath a monorepo root.
#[derive(Debug, Clone)]
pub struct PackageReader {
    root: PathBuf,
}

impl PackageReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Read a single `package.json`.
    ///
    /// `package_file` may be the file itself or its directory. The package
    /// name is required.
    pub fn read_package_info(&self, package_file: &Path) -> Result<PackageInfo> {
        let (file, dir) = if package_file.is_dir() {
            (package_file.join(PACKAGE_FILE), package_file.to_path_buf())
        } else {
            let dir = package_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.root.clone());
            (package_file.to_path_buf(), dir)
        };

        let document = read_package_json(&file)?;
        let name = document.name.ok_or_else(|| Error::Package {
            path: file.display().to_string(),
            message: "missing 'name' field".to_string(),
        })?;

        let repository_url = match document.repository {
            Some(RepositoryField::Url(url)) => Some(url),
            Some(RepositoryField::Object { url }) => url,
            None => None,
        };

        Ok(PackageInfo {
            name,
            version: document.version.unwrap_or_default(),
            path: clean(&dir),
            repository_url,
        })
    }

    /// Workspace member patterns declared by the root package.
    ///
    /// `package.json` `workspaces` wins; `pnpm-workspace.yaml` is consulted
    /// only when the root package declares none.
    pub fn workspace_patterns(&self) -> Result<Vec<String>> {
        let root_file = self.root.join(PACKAGE_FILE);
        // A monorepo of manifest-only actions needs no root package.json.
        if root_file.exists() {
            match read_package_json(&root_file)?.workspaces {
                Some(WorkspacesField::List(patterns)) => return Ok(patterns),
                Some(WorkspacesField::Object { packages }) if !packages.is_empty() => {
                    return Ok(packages)
                }
                _ => {}
            }
        }

        let pnpm_file = self.root.join(PNPM_WORKSPACE_FILE);
        if !pnpm_file.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&pnpm_file)?;
        let pnpm: PnpmWorkspace = serde_yaml::from_str(&content).map_err(|e| Error::Package {
            path: pnpm_file.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(pnpm.packages)
    }

    /// Every workspace member, in discovery order.
    pub fn workspaces(&self) -> Result<Vec<PackageInfo>> {
        let patterns = self.workspace_patterns()?;

        let mut excludes = Vec::new();
        for pattern in patterns.iter().filter_map(|p| p.strip_prefix('!')) {
            excludes.push(Pattern::new(pattern.trim_end_matches('/'))?);
        }

        let mut seen = HashSet::new();
        let mut packages = Vec::new();

        for pattern in patterns.iter().filter(|p| !p.starts_with('!')) {
            let full = self.root.join(pattern.trim_end_matches('/'));
            let full = full.to_string_lossy();

            let mut matches: Vec<PathBuf> = glob::glob(&full)?
                .filter_map(|entry| match entry {
                    Ok(path) => Some(path),
                    Err(e) => {
                        log::warn!("skipping unreadable workspace path: {}", e);
                        None
                    }
                })
                .filter(|path| path.join(PACKAGE_FILE).is_file())
                .collect();
            matches.sort();

            for dir in matches {
                let dir = clean(&dir);
                let relative = relative_to(&self.root, &dir).unwrap_or_default();
                if excludes.iter().any(|p| p.matches(&relative)) {
                    log::debug!("workspace member {} excluded by pattern", relative);
                    continue;
                }
                if seen.insert(dir.clone()) {
                    packages.push(self.read_package_info(&dir)?);
                }
            }
        }

        Ok(packages)
    }
}

fn read_package_json(file: &Path) -> Result<PackageJson> {
    let content = fs::read_to_string(file).map_err(|e| Error::Package {
        path: file.display().to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| Error::Package {
        path: file.display().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn member(name: &str) -> String {
        format!(
            r#"{{"name": "{}", "version": "1.0.0", "repository": {{"type": "git", "url": "https://github.com/acme/{}.git"}}}}"#,
            name, name
        )
    }

    #[test]
    fn test_read_package_info_object_repository() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "pkgs/alpha/package.json", &member("alpha"));

        let reader = PackageReader::new(temp.path());
        let info = reader
            .read_package_info(&temp.path().join("pkgs/alpha/package.json"))
            .unwrap();

        assert_eq!(info.name, "alpha");
        assert_eq!(info.version, "1.0.0");
        assert_eq!(info.path, temp.path().join("pkgs/alpha"));
        assert_eq!(
            info.repository_url.as_deref(),
            Some("https://github.com/acme/alpha.git")
        );
    }

    #[test]
    fn test_read_package_info_string_repository() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "pkgs/alpha/package.json",
            r#"{"name": "alpha", "version": "0.1.0", "repository": "github:acme/alpha"}"#,
        );

        let info = PackageReader::new(temp.path())
            .read_package_info(&temp.path().join("pkgs/alpha"))
            .unwrap();
        assert_eq!(info.repository_url.as_deref(), Some("github:acme/alpha"));
    }

    #[test]
    fn test_read_package_info_without_repository() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "pkgs/alpha/package.json",
            r#"{"name": "alpha", "version": "0.1.0"}"#,
        );

        let info = PackageReader::new(temp.path())
            .read_package_info(&temp.path().join("pkgs/alpha"))
            .unwrap();
        assert!(info.repository_url.is_none());
    }

    #[test]
    fn test_read_package_info_requires_name() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "pkgs/alpha/package.json", r#"{"version": "0.1.0"}"#);

        let err = PackageReader::new(temp.path())
            .read_package_info(&temp.path().join("pkgs/alpha"))
            .unwrap_err();
        assert!(err.to_string().contains("missing 'name'"));
    }

    #[test]
    fn test_workspaces_from_package_json() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "package.json",
            r#"{"private": true, "workspaces": ["pkgs/*"]}"#,
        );
        write(temp.path(), "pkgs/beta/package.json", &member("beta"));
        write(temp.path(), "pkgs/alpha/package.json", &member("alpha"));
        fs::create_dir_all(temp.path().join("pkgs/not-a-package")).unwrap();

        let names: Vec<String> = PackageReader::new(temp.path())
            .workspaces()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_workspaces_object_form_and_exclusion() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "package.json",
            r#"{"workspaces": {"packages": ["pkgs/*", "tools/lint", "!pkgs/internal"]}}"#,
        );
        write(temp.path(), "pkgs/alpha/package.json", &member("alpha"));
        write(temp.path(), "pkgs/internal/package.json", &member("internal"));
        write(temp.path(), "tools/lint/package.json", &member("lint"));

        let names: Vec<String> = PackageReader::new(temp.path())
            .workspaces()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["alpha", "lint"]);
    }

    #[test]
    fn test_workspaces_from_pnpm_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "package.json", r#"{"name": "root", "private": true}"#);
        write(temp.path(), "pnpm-workspace.yaml", "packages:\n  - 'actions/*'\n");
        write(temp.path(), "actions/gamma/package.json", &member("gamma"));

        let packages = PackageReader::new(temp.path()).workspaces().unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "gamma");
    }

    #[test]
    fn test_workspaces_deduplicates_overlapping_patterns() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "package.json",
            r#"{"workspaces": ["pkgs/alpha", "pkgs/*"]}"#,
        );
        write(temp.path(), "pkgs/alpha/package.json", &member("alpha"));
        write(temp.path(), "pkgs/beta/package.json", &member("beta"));

        let names: Vec<String> = PackageReader::new(temp.path())
            .workspaces()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_workspaces_without_declaration_is_empty() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "package.json", r#"{"name": "root"}"#);
        assert!(PackageReader::new(temp.path()).workspaces().unwrap().is_empty());
    }

    #[test]
    fn test_missing_root_package_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(PackageReader::new(temp.path()).workspaces().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_root_package_is_error() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "package.json", "{ not json");
        let err = PackageReader::new(temp.path()).workspaces().unwrap_err();
        assert!(matches!(err, Error::Package { .. }));
    }
}
