//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::alpha_beta();
//!     fixture.command().arg("list").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::Path;
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::layouts;
    pub use super::TestFixture;
}

/// File contents for the standard two-action monorepo.
#[allow(dead_code)]
pub mod layouts {
    pub const ROOT_PACKAGE: &str = r#"{
  "name": "acme-monorepo",
  "private": true,
  "workspaces": ["pkgs/*"]
}
"#;

    pub const ALPHA_PACKAGE: &str = r#"{
  "name": "alpha",
  "version": "1.0.0",
  "repository": {
    "type": "git",
    "url": "https://github.com/acme/alpha-dest.git"
  }
}
"#;

    pub const ALPHA_ACTION: &str = "name: alpha\nruns:\n  using: node20\n  main: dist/index.js\n";

    pub const BETA_ACTION: &str =
        "extends: shared/base.yml\nname: beta\nruns:\n  using: composite\n  steps: []\n";

    pub const BASE_ACTION: &str = "author: acme\nbranding:\n  color: blue\n";

    pub const MANIFEST: &str = r#"actions:
  - name: beta
    version: 2.0.0
    repositoryURL: https://github.com/acme/beta-dest.git
    outputDirectory: actions/beta
"#;

    /// Package build script: echoes and writes `dist/index.js`.
    pub const BUILD_SCRIPT: &str =
        "echo \"building $1\"\nmkdir -p dist\necho \"module.exports = '$1'\" > dist/index.js\n";
}

/// A temporary monorepo.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// JavaScript package `pkgs/alpha` plus manifest action `actions/beta`.
    pub fn alpha_beta() -> Self {
        Self::new()
            .with_file("package.json", layouts::ROOT_PACKAGE)
            .with_file("README.md", "# acme\n")
            .with_file("pkgs/alpha/package.json", layouts::ALPHA_PACKAGE)
            .with_file("pkgs/alpha/action.yml", layouts::ALPHA_ACTION)
            .with_file("pkgs/alpha/README.md", "# alpha\n")
            .with_file("pkgs/alpha/build.sh", layouts::BUILD_SCRIPT)
            .with_file("pkgs/alpha/src/index.ts", "export {}\n")
            .with_file("actions/beta/action.yml", layouts::BETA_ACTION)
            .with_file("shared/base.yml", layouts::BASE_ACTION)
            .with_file("monoship-workspace.yml", layouts::MANIFEST)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.write(path, content);
        self
    }

    /// Overwrite or create a file in place.
    pub fn write(&self, path: &str, content: &str) {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Initialise a repository on `main` and commit everything.
    pub fn with_git(self) -> Self {
        self.git(&["init", "-b", "main"]);
        self.git(&["config", "user.email", "test@example.com"]);
        self.git(&["config", "user.name", "Test User"]);
        self.git(&["config", "commit.gpgsign", "false"]);
        self.commit_all("Initial commit");
        self
    }

    /// Stage everything and commit, allowing empty commits.
    pub fn commit_all(&self, message: &str) {
        self.git(&["add", "-A"]);
        self.git(&["commit", "--allow-empty", "-q", "-m", message]);
    }

    /// Run git in the fixture, panicking on failure.
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// A command for the monoship binary running in this fixture with a
    /// clean environment for everything monoship reads.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("monoship");
        cmd.current_dir(self.path());
        for var in [
            "MONOSHIP_DIRECTORY",
            "MONOSHIP_WORKSPACE",
            "MONOSHIP_BUILD_COMMAND",
            "MONOSHIP_API_URL",
            "GITHUB_TOKEN",
            "GITHUB_APP_ID",
            "GITHUB_APP_INSTALLATION_ID",
            "GITHUB_APP_PRIVATE_KEY",
            "RUST_LOG",
        ] {
            cmd.env_remove(var);
        }
        cmd.arg("--color").arg("never");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let fixture = TestFixture::alpha_beta();
        assert!(fixture.path().join("pkgs/alpha/package.json").exists());
        assert!(fixture.path().join("monoship-workspace.yml").exists());
    }

    #[test]
    fn test_layout_yaml_is_valid() {
        for doc in [
            layouts::ALPHA_ACTION,
            layouts::BETA_ACTION,
            layouts::BASE_ACTION,
            layouts::MANIFEST,
        ] {
            serde_yaml::from_str::<serde_yaml::Value>(doc).expect("layout should be valid YAML");
        }
    }
}
