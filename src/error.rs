//! # Error Handling
//!
//! This module defines the centralized error type for `monoship`. It uses
//! the `thiserror` library to build a single `Error` enum covering every
//! anticipated failure mode, with messages that carry enough context (action
//! name, repository, reference) to be useful in a CI log.
//!
//! ## Key Components
//!
//! - **`Error`**: every failure the library can produce.
//! - **`ErrorCategory`**: a coarse classification used by the batch loops to
//!   decide how loudly to report a failure. Resolution and git-history
//!   errors abort a run, the rest are scoped to one action.
//! - **`Result<T>`**: alias for `std::result::Result<T, Error>`.

use thiserror::Error;

/// Main error type for monoship operations
#[derive(Error, Debug)]
pub enum Error {
    /// The workspace or an action definition is invalid.
    ///
    /// Includes an optional hint describing how to fix the configuration.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// Neither the package metadata nor a manifest entry provided a
    /// repository URL for an action.
    #[error("Repository field missing in action {action}")]
    MissingRepository { action: String },

    /// A repository URL could not be split into owner and repository name.
    #[error("Invalid repository URL '{url}': {message}")]
    InvalidRepositoryUrl { url: String, message: String },

    /// The action manifest exists but could not be parsed.
    #[error("Failed to parse workspace manifest {path}: {message}")]
    Manifest { path: String, message: String },

    /// A `package.json` (root or workspace member) could not be read.
    #[error("Failed to read package metadata {path}: {message}")]
    Package { path: String, message: String },

    /// The action configuration document could not be loaded or merged.
    #[error("Failed to merge action configuration {path}: {message}")]
    Schema { path: String, message: String },

    /// A staging directory could not be created or removed.
    #[error("Could not prepare output directory {path}: {message}")]
    OutputDirectory { path: String, message: String },

    /// The external package build failed to start, exited non-zero, or its
    /// output could not be moved into place.
    #[error("Build failed for {action}: {message}")]
    Build { action: String, message: String },

    /// A local `git` invocation failed.
    #[error("Git command failed: {command} - {stderr}")]
    GitCommand { command: String, stderr: String },

    /// The directory is not inside a git repository.
    #[error("The directory {path} is not a git repository")]
    NotARepository { path: String },

    /// HEAD has no parent, so there is nothing to diff against.
    #[error("Commit {commit} has no parent commit to compare against")]
    NoParentCommit { commit: String },

    /// HEAD does not point at a branch.
    #[error("HEAD is detached; a branch is required to deploy")]
    DetachedHead,

    /// Credentials for the remote API are missing or unusable.
    #[error("Credentials error: {message}")]
    Credentials { message: String },

    /// A remote API call failed.
    #[error("Remote API error during {operation}{}: {message}", status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Api {
        operation: String,
        status: Option<u16>,
        message: String,
    },

    /// The destination repository has no reference matching the local branch.
    #[error("Reference {reference} not found in {repository}")]
    RefNotFound {
        repository: String,
        reference: String,
    },

    /// A non-force reference update found the reference somewhere other
    /// than where the caller expected it.
    #[error("Reference {reference} moved: expected {expected}, found {actual}")]
    RefConflict {
        reference: String,
        expected: String,
        actual: String,
    },

    /// The release tag already exists on the destination repository.
    #[error("Tag already exists: {tag} in {repository}")]
    TagExists { repository: String, tag: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A semantic versioning parsing error, wrapped from `semver::Error`.
    #[error("Semver parsing error: {0}")]
    Semver(#[from] semver::Error),

    /// A directory walk failed, wrapped from `walkdir::Error`.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The action set itself is invalid.
    Configuration,
    /// Local filesystem failure.
    Io,
    /// The external build process failed.
    Build,
    /// Local git history could not be read.
    GitHistory,
    /// A remote API call failed.
    Remote,
    /// The version being released is already tagged.
    DuplicateRelease,
}

impl Error {
    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ConfigParse { .. }
            | Error::MissingRepository { .. }
            | Error::InvalidRepositoryUrl { .. }
            | Error::Manifest { .. }
            | Error::Package { .. }
            | Error::Yaml(_)
            | Error::Json(_)
            | Error::Glob(_)
            | Error::UrlParse(_)
            | Error::Semver(_) => ErrorCategory::Configuration,
            Error::Schema { .. }
            | Error::OutputDirectory { .. }
            | Error::Io(_)
            | Error::Walk(_)
            | Error::LockPoisoned { .. } => ErrorCategory::Io,
            Error::Build { .. } => ErrorCategory::Build,
            Error::GitCommand { .. }
            | Error::NotARepository { .. }
            | Error::NoParentCommit { .. }
            | Error::DetachedHead => ErrorCategory::GitHistory,
            Error::Credentials { .. }
            | Error::Api { .. }
            | Error::RefNotFound { .. }
            | Error::RefConflict { .. } => ErrorCategory::Remote,
            Error::TagExists { .. } => ErrorCategory::DuplicateRelease,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_parse() {
        let error = Error::ConfigParse {
            message: "duplicate action name 'alpha'".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration error"));
        assert!(display.contains("duplicate action name"));
        assert!(!display.contains("hint:"));
    }

    #[test]
    fn test_error_display_config_parse_with_hint() {
        let error = Error::ConfigParse {
            message: "version '1.0' is not semver".to_string(),
            hint: Some("Use MAJOR.MINOR.PATCH".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("hint:"));
        assert!(display.contains("MAJOR.MINOR.PATCH"));
    }

    #[test]
    fn test_error_display_missing_repository() {
        let error = Error::MissingRepository {
            action: "alpha".to_string(),
        };
        assert_eq!(error.to_string(), "Repository field missing in action alpha");
    }

    #[test]
    fn test_error_display_api_with_status() {
        let error = Error::Api {
            operation: "create tree".to_string(),
            status: Some(422),
            message: "Invalid tree info".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("create tree (422)"));
        assert!(display.contains("Invalid tree info"));
    }

    #[test]
    fn test_error_display_api_without_status() {
        let error = Error::Api {
            operation: "list tags".to_string(),
            status: None,
            message: "connection reset".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("during list tags:"));
    }

    #[test]
    fn test_error_display_tag_exists() {
        let error = Error::TagExists {
            repository: "acme/alpha-dest".to_string(),
            tag: "v1.0.0".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("v1.0.0"));
        assert!(display.contains("acme/alpha-dest"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        assert!(error.to_string().contains("I/O error"));
        assert_eq!(error.category(), ErrorCategory::Io);
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(error.to_string().contains("YAML parsing error"));
        assert_eq!(error.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            Error::NoParentCommit {
                commit: "abc".to_string()
            }
            .category(),
            ErrorCategory::GitHistory
        );
        assert_eq!(
            Error::RefConflict {
                reference: "heads/main".to_string(),
                expected: "a".to_string(),
                actual: "b".to_string(),
            }
            .category(),
            ErrorCategory::Remote
        );
        assert_eq!(
            Error::Build {
                action: "alpha".to_string(),
                message: "exit status 1".to_string(),
            }
            .category(),
            ErrorCategory::Build
        );
        assert_eq!(
            Error::TagExists {
                repository: "acme/x".to_string(),
                tag: "v1.0.0".to_string(),
            }
            .category(),
            ErrorCategory::DuplicateRelease
        );
    }
}
