//! Configuration validation.
//!
//! Validation collects every problem before failing, so a single
//! `fnship validate` run reports all of them.

use crate::error::{ConfigError, FnshipError, Result};
use serde::Serialize;
use std::path::{Component, Path};
use tracing::debug;

use super::spec::{AwsConfig, FnshipConfig, FunctionsConfig, SyncConfig};

/// Validator for fnship configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default, Serialize)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug, Serialize)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any were found.
    pub fn validate(&self, config: &FnshipConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_functions(&config.functions, &mut result);
        Self::validate_aws(&config.aws, &mut result);
        Self::validate_sync(&config.sync, &mut result);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(FnshipError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )))
        }
    }

    fn validate_functions(functions: &FunctionsConfig, result: &mut ValidationResult) {
        if let Some(message) = check_repo_relative(&functions.watched_root) {
            result.error("functions.watched_root", message);
        }

        if functions.runtime.trim().is_empty() {
            result.error("functions.runtime", "Runtime cannot be empty");
        }

        if functions.handler.trim().is_empty() {
            result.error("functions.handler", "Handler cannot be empty");
        }

        match functions.execution_role_arn.as_deref() {
            Some(arn) if !arn.starts_with("arn:") => {
                result.error(
                    "functions.execution_role_arn",
                    format!("Execution role '{arn}' is not an ARN"),
                );
            }
            None if functions.create_missing => {
                result.warnings.push(String::from(
                    "create_missing is enabled but no execution role is set; \
                     creating a function will fail",
                ));
            }
            _ => {}
        }
    }

    fn validate_aws(aws: &AwsConfig, result: &mut ValidationResult) {
        if !is_valid_region(&aws.region) {
            result.error(
                "aws.region",
                format!("Region '{}' is invalid. Expected a form like 'us-east-1'.", aws.region),
            );
        }
    }

    fn validate_sync(sync: &SyncConfig, result: &mut ValidationResult) {
        if let Some(bucket) = sync.bucket.as_deref()
            && !is_valid_bucket_name(bucket)
        {
            result.error(
                "sync.bucket",
                format!(
                    "Bucket name '{bucket}' is invalid. Must be 3-63 lowercase letters, digits, dots or hyphens."
                ),
            );
        }

        if let Some(message) = check_repo_relative(&sync.local_dir) {
            result.error("sync.local_dir", message);
        }
    }
}

impl ValidationResult {
    /// Returns true if there are no errors.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.into(),
        });
    }
}

/// Returns a message when `path` is not a plain repository-relative path.
fn check_repo_relative(path: &Path) -> Option<String> {
    if path.as_os_str().is_empty() {
        return Some(String::from("Path cannot be empty"));
    }

    let plain = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

    if plain {
        None
    } else {
        Some(format!(
            "Path '{}' must be relative to the repository and must not contain '..'",
            path.display()
        ))
    }
}

/// Checks the `<area>-<direction>-<number>` shape of AWS region names.
fn is_valid_region(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return false;
    }

    let (area, number) = parts.split_at(parts.len() - 1);
    area.iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_lowercase()))
        && !number[0].is_empty()
        && number[0].chars().all(|c| c.is_ascii_digit())
}

fn is_valid_bucket_name(name: &str) -> bool {
    let len_ok = (3..=63).contains(&name.len());
    let chars_ok = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    let edges_ok = name
        .chars()
        .next()
        .zip(name.chars().last())
        .is_some_and(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric());

    len_ok && chars_ok && edges_ok
}
