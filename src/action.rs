//! # Actions
//!
//! An [`Action`] is one independently versioned, independently deployed unit
//! of the monorepo. It comes from one of two places:
//!
//! - a JavaScript workspace package (`package.json` with a `repository`), or
//! - an entry in the workspace manifest, packaged as a composite or Docker
//!   action.
//!
//! The provenance is kept as a closed enum so every accessor has to say what
//! it means for each kind. Actions are built once by the workspace resolver
//! and never mutated afterwards.
//!
//! ## Building
//!
//! [`Action::build`] creates the action's staging directory and then runs up
//! to three subtasks on a rayon scope:
//!
//! 1. write the merged `action.yml`,
//! 2. copy the auxiliary files (README and any configured assets),
//! 3. for JavaScript actions, run the package build and move its output in.
//!
//! All subtasks run to completion; the first error recorded is returned.

use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Mutex, PoisonError};

use log::debug;
use semver::Version;

use crate::defaults;
use crate::error::{Error, Result};
use crate::manifest::{ManifestActionType, ManifestEntry};
use crate::package::PackageInfo;
use crate::path::{is_within, normalize_directory, parse_repository_url, relative_to, RepositoryUrl};
use crate::schema::{self, ACTION_FILE};

/// The three kinds of action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    JavaScript,
    Composite,
    Docker,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::JavaScript => write!(f, "javascript"),
            ActionKind::Composite => write!(f, "composite"),
            ActionKind::Docker => write!(f, "docker"),
        }
    }
}

/// A manifest-declared action with its directory resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleInfo {
    pub name: String,
    pub version: String,
    /// Absolute action directory
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    JavaScript(PackageInfo),
    Composite(BundleInfo),
    Docker(BundleInfo),
}

/// Everything needed to construct an [`Action`].
#[derive(Debug, Clone, Default)]
pub struct ActionConfig {
    /// Display name, also the staging subdirectory name
    pub name: String,
    /// Absolute monorepo root
    pub working_directory: PathBuf,
    /// Absolute staging directory for this action
    pub output_directory: PathBuf,
    pub package_info: Option<PackageInfo>,
    pub manifest_entry: Option<ManifestEntry>,
}

/// How [`Action::build`] produces its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Package build command; `{name}` is replaced by the package name
    pub command: Vec<String>,
    /// Directory the package build writes into, relative to the package
    pub dist_directory: String,
    /// Files copied from the action directory when present
    pub files: Vec<String>,
    /// Extra files copied into every action's output
    pub assets: Vec<PathBuf>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            command: defaults::build_command(),
            dist_directory: defaults::DIST_DIRECTORY.to_string(),
            files: defaults::auxiliary_files(),
            assets: Vec::new(),
        }
    }
}

impl BuildSettings {
    /// The build command for one package, with `{name}` substituted.
    pub fn command_for(&self, package_name: &str) -> Vec<String> {
        self.command
            .iter()
            .map(|arg| arg.replace("{name}", package_name))
            .collect()
    }
}

/// One publishable unit of the monorepo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    source: Source,
    repository: RepositoryUrl,
    output_directory: PathBuf,
    working_directory: PathBuf,
}

impl Action {
    /// Construct an action from package metadata or a manifest entry.
    ///
    /// Package metadata with a repository URL makes a JavaScript action;
    /// otherwise a manifest entry makes a composite or Docker action. With
    /// neither, construction fails. The repository URL is parsed here, once.
    pub fn new(config: ActionConfig) -> Result<Self> {
        let ActionConfig {
            name,
            working_directory,
            output_directory,
            package_info,
            manifest_entry,
        } = config;

        let (source, url) = match (package_info, manifest_entry) {
            (Some(package), _) if package.repository_url.is_some() => {
                let url = package.repository_url.clone().unwrap_or_default();
                (Source::JavaScript(package), url)
            }
            (_, Some(entry)) => {
                let bundle = BundleInfo {
                    name: entry.name,
                    version: entry.version,
                    path: normalize_directory(
                        &working_directory,
                        Path::new(&entry.output_directory),
                    ),
                };
                let source = match entry.action_type {
                    ManifestActionType::Composite => Source::Composite(bundle),
                    ManifestActionType::Docker => Source::Docker(bundle),
                };
                (source, entry.repository_url)
            }
            _ => return Err(Error::MissingRepository { action: name }),
        };

        let repository = parse_repository_url(&url)?;

        let action = Self {
            source,
            repository,
            output_directory,
            working_directory,
        };

        if let Err(e) = Version::parse(action.version()) {
            return Err(Error::ConfigParse {
                message: format!(
                    "action {} has invalid version '{}': {}",
                    action.name(),
                    action.version(),
                    e
                ),
                hint: Some("Use a semantic version such as 1.2.3".to_string()),
            });
        }

        Ok(action)
    }

    pub fn kind(&self) -> ActionKind {
        match self.source {
            Source::JavaScript(_) => ActionKind::JavaScript,
            Source::Composite(_) => ActionKind::Composite,
            Source::Docker(_) => ActionKind::Docker,
        }
    }

    pub fn name(&self) -> &str {
        match &self.source {
            Source::JavaScript(package) => &package.name,
            Source::Composite(bundle) | Source::Docker(bundle) => &bundle.name,
        }
    }

    pub fn version(&self) -> &str {
        match &self.source {
            Source::JavaScript(package) => &package.version,
            Source::Composite(bundle) | Source::Docker(bundle) => &bundle.version,
        }
    }

    /// Source directory: the package directory for JavaScript actions, the
    /// declared action directory otherwise.
    pub fn path(&self) -> &Path {
        match &self.source {
            Source::JavaScript(package) => &package.path,
            Source::Composite(bundle) | Source::Docker(bundle) => &bundle.path,
        }
    }

    pub fn owner(&self) -> &str {
        &self.repository.owner
    }

    pub fn repo_name(&self) -> &str {
        &self.repository.name
    }

    pub fn repository(&self) -> &RepositoryUrl {
        &self.repository
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// The release tag for the current version, `v<version>`.
    pub fn tag(&self) -> String {
        format!("v{}", self.version())
    }

    /// [`Action::path`] relative to the monorepo root, `/`-separated.
    pub fn relative_path(&self) -> Option<String> {
        relative_to(&self.working_directory, self.path())
    }

    /// Whether a repo-relative file path belongs to this action.
    pub fn contains(&self, file: &str) -> bool {
        self.relative_path()
            .is_some_and(|prefix| is_within(&prefix, file))
    }

    /// The merged `action.yml` as YAML text, without writing anything.
    pub fn merged_config(&self) -> Result<String> {
        let file = self.path().join(ACTION_FILE);
        let config = schema::get_config(&self.working_directory, &file)?;
        schema::to_yaml(&config)
    }

    /// Build the action into its output directory.
    ///
    /// The output directory must not exist yet. Subtasks are not cancelled
    /// when one fails; every one is awaited and the first recorded error wins.
    pub fn build(&self, settings: &BuildSettings) -> Result<()> {
        self.create_output_directory()?;

        let first_error: Mutex<Option<Error>> = Mutex::new(None);
        let record = |result: Result<()>| {
            if let Err(e) = result {
                let mut slot = first_error.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.is_none() {
                    *slot = Some(e);
                } else {
                    debug!("{}: additional build failure: {}", self.name(), e);
                }
            }
        };
        let record = &record;

        rayon::scope(|s| {
            s.spawn(move |_| record(self.write_action_yaml()));
            s.spawn(move |_| record(self.copy_files(settings)));
            if let Source::JavaScript(package) = &self.source {
                s.spawn(move |_| record(self.build_package(package, settings)));
            }
        });

        match first_error.into_inner() {
            Ok(None) => Ok(()),
            Ok(Some(e)) => Err(e),
            Err(_) => Err(Error::LockPoisoned {
                context: format!("build of {}", self.name()),
            }),
        }
    }

    fn create_output_directory(&self) -> Result<()> {
        fs::create_dir(&self.output_directory).map_err(|e| Error::OutputDirectory {
            path: self.output_directory.display().to_string(),
            message: e.to_string(),
        })
    }

    fn write_action_yaml(&self) -> Result<()> {
        let yaml = self.merged_config()?;
        let output = self.output_directory.join(ACTION_FILE);
        fs::write(&output, yaml).map_err(|e| Error::OutputDirectory {
            path: output.display().to_string(),
            message: format!("could not create {}: {}", ACTION_FILE, e),
        })
    }

    fn copy_files(&self, settings: &BuildSettings) -> Result<()> {
        for file in &settings.files {
            let src = self.path().join(file);
            let dst = self.output_directory.join(file);
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            match fs::copy(&src, &dst) {
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound && !src.exists() => {
                    debug!("{}: no {} to copy", self.name(), file);
                }
                Err(e) => return Err(e.into()),
            }
        }

        for asset in &settings.assets {
            let file_name = asset.file_name().ok_or_else(|| Error::OutputDirectory {
                path: asset.display().to_string(),
                message: "asset path has no file name".to_string(),
            })?;
            fs::copy(asset, self.output_directory.join(file_name)).map_err(|e| {
                Error::OutputDirectory {
                    path: asset.display().to_string(),
                    message: format!("could not copy asset: {}", e),
                }
            })?;
        }

        Ok(())
    }

    fn build_package(&self, package: &PackageInfo, settings: &BuildSettings) -> Result<()> {
        let build_error = |message: String| Error::Build {
            action: self.name().to_string(),
            message,
        };

        let args = settings.command_for(&package.name);
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| build_error("build command is empty".to_string()))?;

        debug!("{}: running {}", self.name(), args.join(" "));
        let mut child = Command::new(program)
            .args(rest)
            .current_dir(&package.path)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| build_error(format!("could not start `{}`: {}", program, e)))?;

        let prefix = self
            .relative_path()
            .unwrap_or_else(|| package.path.display().to_string());

        let mut read_error = None;
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(line) => println!("{}: {}", prefix, line),
                    Err(e) => {
                        read_error = Some(build_error(format!("could not read output: {}", e)));
                        break;
                    }
                }
            }
        }

        // The child is always reaped, even when its output was unreadable.
        let status = child
            .wait()
            .map_err(|e| build_error(format!("could not wait for `{}`: {}", program, e)))?;
        if let Some(e) = read_error {
            return Err(e);
        }
        if !status.success() {
            return Err(build_error(format!("`{}` exited with {}", args.join(" "), status)));
        }

        self.move_package(package, settings)
    }

    fn move_package(&self, package: &PackageInfo, settings: &BuildSettings) -> Result<()> {
        let dist = package.path.join(&settings.dist_directory);
        let destination = self.output_directory.join(&settings.dist_directory);

        fs::rename(&dist, &destination).map_err(|e| Error::Build {
            action: self.name().to_string(),
            message: format!("could not move {}: {}", dist.display(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn package(root: &Path, name: &str, url: Option<&str>) -> PackageInfo {
        PackageInfo {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            path: root.join("pkgs").join(name),
            repository_url: url.map(str::to_string),
        }
    }

    fn entry(name: &str, dir: &str, action_type: ManifestActionType) -> ManifestEntry {
        ManifestEntry {
            name: name.to_string(),
            version: "2.0.0".to_string(),
            repository_url: format!("https://github.com/acme/{}-dest.git", name),
            output_directory: dir.to_string(),
            action_type,
        }
    }

    fn js_action(root: &Path, output: &Path) -> Action {
        Action::new(ActionConfig {
            name: "alpha".to_string(),
            working_directory: root.to_path_buf(),
            output_directory: output.join("alpha"),
            package_info: Some(package(
                root,
                "alpha",
                Some("https://github.com/acme/alpha-dest.git"),
            )),
            manifest_entry: None,
        })
        .unwrap()
    }

    fn composite_action(root: &Path, output: &Path, name: &str) -> Action {
        Action::new(ActionConfig {
            name: name.to_string(),
            working_directory: root.to_path_buf(),
            output_directory: output.join(name),
            package_info: None,
            manifest_entry: Some(entry(
                name,
                &format!("actions/{}", name),
                ManifestActionType::Composite,
            )),
        })
        .unwrap()
    }

    #[test]
    fn test_javascript_action_accessors() {
        let root = Path::new("/repo");
        let action = js_action(root, Path::new("/repo/build"));

        assert_eq!(action.kind(), ActionKind::JavaScript);
        assert_eq!(action.name(), "alpha");
        assert_eq!(action.version(), "1.0.0");
        assert_eq!(action.path(), Path::new("/repo/pkgs/alpha"));
        assert_eq!(action.owner(), "acme");
        assert_eq!(action.repo_name(), "alpha-dest");
        assert_eq!(action.tag(), "v1.0.0");
        assert_eq!(action.relative_path().as_deref(), Some("pkgs/alpha"));
        assert_eq!(action.output_directory(), Path::new("/repo/build/alpha"));
    }

    #[test]
    fn test_composite_action_path_is_normalized() {
        let root = Path::new("/repo");
        let action = composite_action(root, Path::new("/repo/build"), "beta");

        assert_eq!(action.kind(), ActionKind::Composite);
        assert_eq!(action.name(), "beta");
        assert_eq!(action.version(), "2.0.0");
        assert_eq!(action.path(), Path::new("/repo/actions/beta"));
        assert_eq!(action.repo_name(), "beta-dest");
    }

    #[test]
    fn test_manifest_absolute_path_kept() {
        let action = Action::new(ActionConfig {
            name: "scan".to_string(),
            working_directory: PathBuf::from("/repo"),
            output_directory: PathBuf::from("/repo/build/scan"),
            package_info: None,
            manifest_entry: Some(entry("scan", "/opt/scan", ManifestActionType::Docker)),
        })
        .unwrap();

        assert_eq!(action.kind(), ActionKind::Docker);
        assert_eq!(action.path(), Path::new("/opt/scan"));
        assert!(action.relative_path().is_none());
        assert!(!action.contains("opt/scan/x"));
    }

    #[test]
    fn test_package_without_repository_falls_back_to_manifest() {
        let root = Path::new("/repo");
        let action = Action::new(ActionConfig {
            name: "beta".to_string(),
            working_directory: root.to_path_buf(),
            output_directory: root.join("build/beta"),
            package_info: Some(package(root, "beta", None)),
            manifest_entry: Some(entry("beta", "actions/beta", ManifestActionType::Composite)),
        })
        .unwrap();
        assert_eq!(action.kind(), ActionKind::Composite);
    }

    #[test]
    fn test_missing_repository_fails() {
        let root = Path::new("/repo");
        let err = Action::new(ActionConfig {
            name: "alpha".to_string(),
            working_directory: root.to_path_buf(),
            output_directory: root.join("build/alpha"),
            package_info: Some(package(root, "alpha", None)),
            manifest_entry: None,
        })
        .unwrap_err();
        assert!(matches!(err, Error::MissingRepository { .. }));
    }

    #[test]
    fn test_unparsable_repository_fails() {
        let root = Path::new("/repo");
        let err = Action::new(ActionConfig {
            name: "alpha".to_string(),
            working_directory: root.to_path_buf(),
            output_directory: root.join("build/alpha"),
            package_info: Some(package(root, "alpha", Some("https://github.com/acme"))),
            manifest_entry: None,
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidRepositoryUrl { .. }));
    }

    #[test]
    fn test_invalid_version_fails() {
        let root = Path::new("/repo");
        let mut info = package(root, "alpha", Some("acme/alpha"));
        info.version = "1.0".to_string();
        let err = Action::new(ActionConfig {
            name: "alpha".to_string(),
            working_directory: root.to_path_buf(),
            output_directory: root.join("build/alpha"),
            package_info: Some(info),
            manifest_entry: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("invalid version '1.0'"));
    }

    #[test]
    fn test_contains_is_separator_anchored() {
        let root = Path::new("/repo");
        let mut info = package(root, "foo", Some("acme/foo"));
        info.path = PathBuf::from("/repo/pkgs/foo");
        let action = Action::new(ActionConfig {
            name: "foo".to_string(),
            working_directory: root.to_path_buf(),
            output_directory: root.join("build/foo"),
            package_info: Some(info),
            manifest_entry: None,
        })
        .unwrap();

        assert!(action.contains("pkgs/foo/x.ts"));
        assert!(!action.contains("pkgs/foobar/x.ts"));
        assert!(!action.contains("pkgs/foo"));
    }

    #[test]
    fn test_command_for_substitutes_name() {
        let settings = BuildSettings::default();
        assert_eq!(
            settings.command_for("@acme/alpha"),
            vec!["pnpm", "exec", "nx", "run", "@acme/alpha:build"]
        );
    }

    #[test]
    fn test_build_composite_action() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let output = root.join("build");
        fs::create_dir_all(root.join("actions/beta")).unwrap();
        fs::create_dir_all(&output).unwrap();
        fs::write(root.join("actions/beta/action.yml"), "name: beta\nruns:\n  using: composite\n").unwrap();
        fs::write(root.join("actions/beta/README.md"), "# beta").unwrap();

        let action = composite_action(root, &output, "beta");
        action.build(&BuildSettings::default()).unwrap();

        let written = fs::read_to_string(output.join("beta/action.yml")).unwrap();
        assert!(written.contains("using: composite"));
        assert_eq!(fs::read_to_string(output.join("beta/README.md")).unwrap(), "# beta");
    }

    #[test]
    fn test_build_without_readme_succeeds() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let output = root.join("build");
        fs::create_dir_all(root.join("actions/beta")).unwrap();
        fs::create_dir_all(&output).unwrap();
        fs::write(root.join("actions/beta/action.yml"), "name: beta\n").unwrap();

        let action = composite_action(root, &output, "beta");
        action.build(&BuildSettings::default()).unwrap();
        assert!(!output.join("beta/README.md").exists());
    }

    #[test]
    fn test_build_copies_assets() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let output = root.join("build");
        fs::create_dir_all(root.join("actions/beta")).unwrap();
        fs::create_dir_all(&output).unwrap();
        fs::write(root.join("actions/beta/action.yml"), "name: beta\n").unwrap();
        fs::write(root.join("LICENSE"), "MIT").unwrap();

        let settings = BuildSettings {
            assets: vec![root.join("LICENSE")],
            ..BuildSettings::default()
        };
        composite_action(root, &output, "beta").build(&settings).unwrap();
        assert_eq!(fs::read_to_string(output.join("beta/LICENSE")).unwrap(), "MIT");
    }

    #[test]
    fn test_build_fails_when_output_exists() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let output = root.join("build");
        fs::create_dir_all(output.join("beta")).unwrap();

        let err = composite_action(root, &output, "beta")
            .build(&BuildSettings::default())
            .unwrap_err();
        assert!(matches!(err, Error::OutputDirectory { .. }));
    }

    #[test]
    fn test_build_fails_without_action_yml() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let output = root.join("build");
        fs::create_dir_all(root.join("actions/beta")).unwrap();
        fs::create_dir_all(&output).unwrap();

        let err = composite_action(root, &output, "beta")
            .build(&BuildSettings::default())
            .unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_build_javascript_action_moves_dist() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let output = root.join("build");
        fs::create_dir_all(root.join("pkgs/alpha")).unwrap();
        fs::create_dir_all(&output).unwrap();
        fs::write(root.join("pkgs/alpha/action.yml"), "name: alpha\n").unwrap();

        let settings = BuildSettings {
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "mkdir -p dist && echo 'built {name}' > dist/index.js && echo done".to_string(),
            ],
            ..BuildSettings::default()
        };

        js_action(root, &output).build(&settings).unwrap();

        assert_eq!(
            fs::read_to_string(output.join("alpha/dist/index.js")).unwrap(),
            "built alpha\n"
        );
        assert!(!root.join("pkgs/alpha/dist").exists());
        assert!(output.join("alpha/action.yml").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_build_javascript_action_reports_failed_command() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let output = root.join("build");
        fs::create_dir_all(root.join("pkgs/alpha")).unwrap();
        fs::create_dir_all(&output).unwrap();
        fs::write(root.join("pkgs/alpha/action.yml"), "name: alpha\n").unwrap();

        let settings = BuildSettings {
            command: vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()],
            ..BuildSettings::default()
        };

        let err = js_action(root, &output).build(&settings).unwrap_err();
        assert!(matches!(err, Error::Build { .. }));
        // The other subtasks still ran to completion.
        assert!(output.join("alpha/action.yml").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_build_waits_for_command_after_unreadable_output() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let output = root.join("build");
        fs::create_dir_all(root.join("pkgs/alpha")).unwrap();
        fs::create_dir_all(&output).unwrap();
        fs::write(root.join("pkgs/alpha/action.yml"), "name: alpha\n").unwrap();

        // Invalid UTF-8 fails the line reader; the marker is written later.
        let settings = BuildSettings {
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "printf '\\377\\n'; sleep 1; touch finished".to_string(),
            ],
            ..BuildSettings::default()
        };

        let err = js_action(root, &output).build(&settings).unwrap_err();
        assert!(err.to_string().contains("could not read output"));
        assert!(root.join("pkgs/alpha/finished").exists());
    }

    #[test]
    fn test_merged_config_does_not_write() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("actions/beta")).unwrap();
        fs::write(root.join("actions/beta/action.yml"), "name: beta\n").unwrap();

        let action = composite_action(root, &root.join("build"), "beta");
        let yaml = action.merged_config().unwrap();
        assert!(yaml.contains("name: beta"));
        assert!(!root.join("build").exists());
    }
}
