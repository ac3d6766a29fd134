//! Workspace manifest for non-JavaScript actions
//!
//! Composite and Docker actions have no `package.json`, so they are declared
//! in a YAML file at the monorepo root:
//!
//! ```yaml
//! actions:
//!   - name: beta
//!     version: 2.0.0
//!     repositoryURL: https://github.com/acme/beta-dest.git
//!     outputDirectory: actions/beta
//!   - name: scanner
//!     type: docker
//!     version: 0.3.1
//!     repositoryURL: https://github.com/acme/scanner.git
//!     outputDirectory: actions/scanner
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a manifest-declared action is packaged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestActionType {
    #[default]
    Composite,
    Docker,
}

/// One entry of the `actions` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub name: String,
    pub version: String,
    #[serde(rename = "repositoryURL")]
    pub repository_url: String,
    /// Action directory, relative to the monorepo root unless absolute
    pub output_directory: String,
    #[serde(default, rename = "type")]
    pub action_type: ManifestActionType,
}

/// The parsed manifest file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceManifest {
    #[serde(default)]
    pub actions: Vec<ManifestEntry>,
}

/// Parse manifest YAML.
pub fn parse(content: &str, origin: &str) -> Result<WorkspaceManifest> {
    if content.trim().is_empty() {
        return Ok(WorkspaceManifest::default());
    }
    serde_yaml::from_str(content).map_err(|e| Error::Manifest {
        path: origin.to_string(),
        message: e.to_string(),
    })
}

/// Read the manifest at `path`.
///
/// A missing file is `Ok(None)`: a workspace without composite actions is
/// perfectly valid. Any other read failure, or malformed YAML, is an error.
pub fn read(path: &Path) -> Result<Option<WorkspaceManifest>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::Manifest {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        }
    };
    parse(&content, &path.display().to_string()).map(Some)
}
