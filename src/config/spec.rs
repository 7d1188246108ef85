//! Configuration specification types for fnship.
//!
//! This module defines the structs that map to the `fnship.yaml` file. Every
//! section is optional: a repository without a configuration file deploys
//! with the defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default directory whose immediate subdirectories are deploy units.
pub const DEFAULT_WATCHED_ROOT: &str = "AWSLambdaFunctions";

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default runtime for newly created functions.
pub const DEFAULT_RUNTIME: &str = "python3.8";

/// Default handler for newly created functions.
pub const DEFAULT_HANDLER: &str = "lambda_function.lambda_handler";

/// Default local directory mirrored by `sync`.
pub const DEFAULT_SYNC_DIR: &str = "DaveBucket";

/// Default directory for transient archives.
pub const DEFAULT_ARTIFACT_DIR: &str = ".fnship/artifacts";

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FnshipConfig {
    /// Function deployment settings.
    #[serde(default)]
    pub functions: FunctionsConfig,
    /// AWS settings shared by every command.
    #[serde(default)]
    pub aws: AwsConfig,
    /// Bucket sync settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Function deployment settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FunctionsConfig {
    /// Repository-relative directory holding one subdirectory per function.
    pub watched_root: PathBuf,
    /// Where archives are written. Relative paths resolve against the
    /// repository working directory.
    pub artifact_dir: PathBuf,
    /// What to do when a unit fails.
    pub failure_policy: FailurePolicy,
    /// Create functions that do not exist yet instead of failing.
    pub create_missing: bool,
    /// Runtime for created functions.
    pub runtime: String,
    /// Handler for created functions.
    pub handler: String,
    /// Execution role ARN for created functions.
    pub execution_role_arn: Option<String>,
}

/// AWS settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AwsConfig {
    /// Region for all API calls.
    pub region: String,
}

/// Bucket sync settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// Target bucket. Required by the `sync` command.
    pub bucket: Option<String>,
    /// Repository-relative directory to mirror.
    pub local_dir: PathBuf,
    /// Optional key prefix inside the bucket.
    pub prefix: Option<String>,
    /// Delete remote objects that no longer exist locally.
    pub delete_removed: bool,
}

/// Failure handling across a batch of units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing unit; later units are never attempted.
    #[default]
    FailFast,
    /// Attempt every unit and report every failure.
    ContinueOnError,
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            watched_root: PathBuf::from(DEFAULT_WATCHED_ROOT),
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            failure_policy: FailurePolicy::default(),
            create_missing: false,
            runtime: String::from(DEFAULT_RUNTIME),
            handler: String::from(DEFAULT_HANDLER),
            execution_role_arn: None,
        }
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: String::from(DEFAULT_REGION),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            local_dir: PathBuf::from(DEFAULT_SYNC_DIR),
            prefix: None,
            delete_removed: true,
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailFast => write!(f, "fail-fast"),
            Self::ContinueOnError => write!(f, "continue-on-error"),
        }
    }
}

impl SyncConfig {
    /// Returns the key prefix normalized to either empty or `segment/`.
    #[must_use]
    pub fn normalized_prefix(&self) -> String {
        self.prefix
            .as_deref()
            .map(|p| {
                let p = p.trim_matches('/');
                if p.is_empty() {
                    String::new()
                } else {
                    format!("{p}/")
                }
            })
            .unwrap_or_default()
    }
}
