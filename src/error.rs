//! Error types for the NoOps deployment system.
//!
//! This module provides the error hierarchy for every step of a deployment:
//! configuration, target planning, version verification, profile gating,
//! chart packaging and external command execution.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the NoOps deployment system.
#[derive(Debug, Error)]
pub enum NoopsError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Target planning errors.
    #[error("Target error: {0}")]
    Target(#[from] TargetError),

    /// Version specification errors.
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    /// Profile gating errors.
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Chart packaging errors.
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// External command errors.
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A `clustersCount` value is neither an integer nor `Remaining`.
    #[error("Invalid clustersCount value '{value}' (expected an integer or 'Remaining')")]
    InvalidClustersCount {
        /// The rejected value.
        value: String,
    },

    /// Environment variable is missing or invalid.
    #[error("Invalid environment variable {name}: {message}")]
    InvalidEnvVar {
        /// Name of the variable.
        name: String,
        /// Why the value was rejected.
        message: String,
    },
}

/// Target planning errors.
#[derive(Debug, Error)]
pub enum TargetError {
    /// Fewer matching clusters than requested.
    #[error(
        "{requested} cluster{} required but only {available} available",
        plural_suffix(.requested)
    )]
    ClustersAvailability {
        /// Clusters left in the pool.
        available: usize,
        /// Clusters requested by the role.
        requested: usize,
    },

    /// The role assignment does not map to any target class.
    #[error("It is not possible to compute the target. Please verify clustersCount settings")]
    PlanTargetUnknown,

    /// The requested target is not supported.
    #[error("Target '{target}' is not supported{}", expected_suffix(.expected))]
    TargetNotSupported {
        /// The requested target.
        target: String,
        /// Targets that would have been accepted, if known.
        expected: Vec<String>,
    },
}

const fn plural_suffix(count: &usize) -> &'static str {
    if *count > 1 { "s" } else { "" }
}

fn expected_suffix(expected: &[String]) -> String {
    if expected.is_empty() {
        String::new()
    } else {
        format!(" (expected: {})", expected.join(", "))
    }
}

/// Version specification errors.
#[derive(Debug, Error)]
pub enum VersionError {
    /// A version invariant does not hold.
    #[error("Version verification failed: {0}")]
    VerifyFailure(String),
}

/// Profile gating errors.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The chart does not declare support for the profile.
    #[error("Profile '{profile}' is not supported by the chart")]
    ProfileNotSupported {
        /// The rejected profile.
        profile: String,
    },

    /// The requested combination of profiles is not allowed.
    #[error("Profile conflict: {message}")]
    ProfileConflict {
        /// Description of the conflict.
        message: String,
    },
}

/// Chart packaging errors.
#[derive(Debug, Error)]
pub enum PackageError {
    /// No chart matched the search keyword.
    #[error("Chart not found for keyword '{keyword}'")]
    ChartNotFound {
        /// The search keyword.
        keyword: String,
    },

    /// A required file is missing.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// A kustomize env overlay exists without a base.
    #[error("Kustomize overlay {path} exists without a kustomize/base directory")]
    KustomizeStructure {
        /// The overlay directory.
        path: PathBuf,
    },

    /// An archive member would be written outside the destination.
    #[error("Unsafe archive entry rejected: {entry}")]
    UnsafeArchiveEntry {
        /// The member path as stored in the archive.
        entry: String,
    },

    /// The chart descriptor could not be read.
    #[error("Invalid chart descriptor {path}: {message}")]
    InvalidChartDescriptor {
        /// Path to the descriptor.
        path: PathBuf,
        /// Parse failure.
        message: String,
    },

    /// Package manager output could not be decoded.
    #[error("Invalid output from '{command}': {message}")]
    InvalidOutput {
        /// The command that produced the output.
        command: String,
        /// Decoding failure.
        message: String,
    },
}

/// External command errors.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command exited with a non-zero status.
    #[error("Command '{command}' failed with status {status}: {stderr}")]
    Failed {
        /// The full command line.
        command: String,
        /// Exit status, or -1 if terminated by a signal.
        status: i32,
        /// Captured standard error.
        stderr: String,
    },

    /// The command could not be started.
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        /// The full command line.
        command: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for NoOps operations.
pub type Result<T> = std::result::Result<T, NoopsError>;

impl NoopsError {
    /// Creates an internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Creates a version verification failure.
    #[must_use]
    pub fn verify_failure(message: impl Into<String>) -> Self {
        Self::Version(VersionError::VerifyFailure(message.into()))
    }

    /// Creates a file-not-found error for the given path.
    #[must_use]
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::Package(PackageError::FileNotFound { path: path.into() })
    }

    /// Returns true if this error came from an external command.
    #[must_use]
    pub const fn is_command_failure(&self) -> bool {
        matches!(self, Self::Command(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_message() {
        let err = TargetError::ClustersAvailability {
            available: 1,
            requested: 2,
        };
        assert_eq!(err.to_string(), "2 clusters required but only 1 available");

        let err = TargetError::ClustersAvailability {
            available: 0,
            requested: 1,
        };
        assert_eq!(err.to_string(), "1 cluster required but only 0 available");
    }

    #[test]
    fn test_target_not_supported_lists_expected() {
        let err = TargetError::TargetNotSupported {
            target: "one-cluster".to_string(),
            expected: vec!["active".to_string(), "standby".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Target 'one-cluster' is not supported (expected: active, standby)"
        );
    }

    #[test]
    fn test_conversion_into_root() {
        let err: NoopsError = VersionError::VerifyFailure("boom".to_string()).into();
        assert!(matches!(err, NoopsError::Version(_)));
        assert!(!err.is_command_failure());
    }
}
