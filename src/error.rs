//! Error types for the fnship deployment tool.
//!
//! This module provides the error hierarchy for every phase of a run:
//! configuration, change resolution, packaging, deployment and bucket sync.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for fnship.
#[derive(Debug, Error)]
pub enum FnshipError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Change set resolution errors.
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Packaging errors.
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Remote deployment errors.
    #[error("Deployment error: {0}")]
    Deploy(#[from] DeployError),

    /// Bucket synchronization errors.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error, indicating a tooling bug rather than an
    /// environmental condition.
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

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },
}

/// Change set resolution errors.
///
/// An unresolvable base reference is not one of these: the resolver falls
/// back to the root commit instead.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The repository could not be opened.
    #[error("Failed to open repository at {path}: {message}")]
    RepositoryOpen {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying git message.
        message: String,
    },

    /// The head reference does not name a commit.
    #[error("Head reference '{reference}' does not resolve to a commit: {message}")]
    HeadNotFound {
        /// The reference as given.
        reference: String,
        /// Underlying git message.
        message: String,
    },

    /// Any other git failure while walking or diffing.
    #[error("Git operation failed: {message}")]
    Git {
        /// Underlying git message.
        message: String,
    },
}

/// Packaging errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The unit directory does not exist.
    #[error("Unit directory not found: {path}")]
    MissingDirectory {
        /// Path to the missing directory.
        path: PathBuf,
    },

    /// The unit path exists but is not a directory.
    #[error("Unit path is not a directory: {path}")]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },

    /// The unit directory contains no files.
    #[error("Unit directory is empty, refusing to package: {path}")]
    EmptyDirectory {
        /// Path to the empty directory.
        path: PathBuf,
    },

    /// Writing the archive failed.
    #[error("Failed to write archive {path}: {message}")]
    ArchiveWrite {
        /// Archive path.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}

/// Remote deployment errors.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The function is not registered on the remote platform.
    #[error("Function not found: {function}: {}{message}", .code.as_deref().map(|c| format!("[{c}] ")).unwrap_or_default())]
    FunctionNotFound {
        /// Function name.
        function: String,
        /// Service error code.
        code: Option<String>,
        /// Error message as returned by the service.
        message: String,
    },

    /// The remote API rejected the request.
    #[error("Lambda API error for {function}: {}{message}", .code.as_deref().map(|c| format!("[{c}] ")).unwrap_or_default())]
    Api {
        /// Function name.
        function: String,
        /// Service error code, if the service returned one.
        code: Option<String>,
        /// Error message as returned by the service.
        message: String,
    },

    /// A function must be created but no execution role is configured.
    #[error("Cannot create function {function}: no execution role configured (set LAMBDA_EXECUTION_ROLE_ARN)")]
    MissingExecutionRole {
        /// Function name.
        function: String,
    },

    /// The archive could not be read back for upload.
    #[error("Failed to read archive {path}: {message}")]
    ArchiveRead {
        /// Archive path.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// The run was stopped after a unit failed.
    #[error("Deployment aborted at unit '{unit}' during {phase}: {message}")]
    Aborted {
        /// Unit that failed.
        unit: String,
        /// Phase that failed.
        phase: String,
        /// Failure detail.
        message: String,
    },

    /// Every unit was attempted and some of them failed.
    #[error("{} of {total} unit(s) failed: {}", .failed.len(), .failed.join(", "))]
    PartialFailure {
        /// Units that failed.
        failed: Vec<String>,
        /// Units attempted.
        total: usize,
    },
}

/// Bucket synchronization errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local source directory does not exist.
    #[error("Local sync directory not found: {path}")]
    LocalDirMissing {
        /// Path to the missing directory.
        path: PathBuf,
    },

    /// An S3 request failed.
    #[error("S3 {operation} failed for s3://{bucket}/{key}: {message}")]
    S3 {
        /// Operation name.
        operation: &'static str,
        /// Bucket name.
        bucket: String,
        /// Object key or prefix.
        key: String,
        /// Description of the failure.
        message: String,
    },
}

/// Result type alias for fnship operations.
pub type Result<T> = std::result::Result<T, FnshipError>;

impl FnshipError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the run phase this error belongs to, for log markers.
    #[must_use]
    pub const fn phase(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::Resolve(_) => "resolution",
            Self::Build(_) => "build",
            Self::Deploy(_) => "deploy",
            Self::Sync(_) => "sync",
            Self::Io(_) | Self::Internal(_) => "internal",
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl ResolveError {
    /// Wraps a git error.
    #[must_use]
    pub fn git(err: &git2::Error) -> Self {
        Self::Git {
            message: err.message().to_string(),
        }
    }
}

impl From<git2::Error> for FnshipError {
    fn from(err: git2::Error) -> Self {
        Self::Resolve(ResolveError::git(&err))
    }
}

impl BuildError {
    /// Creates an archive write error.
    #[must_use]
    pub fn archive_write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ArchiveWrite {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl DeployError {
    /// Creates an API error carrying the service's code and message verbatim.
    #[must_use]
    pub fn api(
        function: impl Into<String>,
        code: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self::Api {
            function: function.into(),
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// Creates a not-found error carrying the service's code and message.
    #[must_use]
    pub fn not_found(
        function: impl Into<String>,
        code: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self::FunctionNotFound {
            function: function.into(),
            code: code.map(str::to_string),
            message: message.into(),
        }
    }
}

impl SyncError {
    /// Creates an S3 error.
    #[must_use]
    pub fn s3(
        operation: &'static str,
        bucket: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::S3 {
            operation,
            bucket: bucket.into(),
            key: key.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FnshipError::Build(BuildError::EmptyDirectory {
            path: PathBuf::from("AWSLambdaFunctions/alpha"),
        });
        assert!(err.to_string().contains("AWSLambdaFunctions/alpha"));
        assert_eq!(err.phase(), "build");
    }

    #[test]
    fn test_api_error_keeps_service_detail() {
        let err = DeployError::api("alpha", Some("TooManyRequestsException"), "Rate exceeded");
        assert_eq!(
            err.to_string(),
            "Lambda API error for alpha: [TooManyRequestsException] Rate exceeded"
        );

        let bare = DeployError::api("alpha", None, "boom");
        assert_eq!(bare.to_string(), "Lambda API error for alpha: boom");
    }

    #[test]
    fn test_not_found_keeps_service_detail() {
        let err = DeployError::not_found(
            "alpha",
            Some("ResourceNotFoundException"),
            "Function not found: arn:aws:lambda:us-east-1:123456789012:function:alpha",
        );
        assert_eq!(
            err.to_string(),
            "Function not found: alpha: [ResourceNotFoundException] \
             Function not found: arn:aws:lambda:us-east-1:123456789012:function:alpha"
        );
    }

    #[test]
    fn test_git_error_maps_to_resolution() {
        let err: FnshipError = git2::Error::from_str("bad object").into();
        assert_eq!(err.phase(), "resolution");
    }
}
