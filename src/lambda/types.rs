//! Lambda deployment types.

use serde::Serialize;
use std::fmt;

use crate::config::FunctionsConfig;

/// What the deployer did to the remote function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployAction {
    /// Existing function code was replaced.
    Updated,
    /// The function did not exist and was created.
    Created,
}

/// Successful deployment of one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployOutcome {
    /// Update or create.
    pub action: DeployAction,
    /// Function version reported by the service.
    pub version: Option<String>,
    /// Code hash reported by the service (base64 sha256).
    pub code_sha256: Option<String>,
    /// Function ARN reported by the service.
    pub function_arn: Option<String>,
}

/// Settings used when a missing function is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSettings {
    /// Runtime identifier, e.g. `python3.8`.
    pub runtime: String,
    /// Handler, e.g. `lambda_function.lambda_handler`.
    pub handler: String,
    /// Execution role ARN.
    pub execution_role_arn: Option<String>,
}

impl CreateSettings {
    /// Extracts creation settings, or `None` when creation is disabled.
    #[must_use]
    pub fn from_config(functions: &FunctionsConfig) -> Option<Self> {
        functions.create_missing.then(|| Self {
            runtime: functions.runtime.clone(),
            handler: functions.handler.clone(),
            execution_role_arn: functions.execution_role_arn.clone(),
        })
    }
}

impl fmt::Display for DeployAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Updated => write!(f, "updated"),
            Self::Created => write!(f, "created"),
        }
    }
}

impl DeployOutcome {
    /// Outcome of a code update.
    #[must_use]
    pub fn updated(version: Option<&str>, code_sha256: Option<&str>, arn: Option<&str>) -> Self {
        Self {
            action: DeployAction::Updated,
            version: version.map(str::to_string),
            code_sha256: code_sha256.map(str::to_string),
            function_arn: arn.map(str::to_string),
        }
    }

    /// Outcome of a function creation.
    #[must_use]
    pub fn created(version: Option<&str>, code_sha256: Option<&str>, arn: Option<&str>) -> Self {
        Self {
            action: DeployAction::Created,
            ..Self::updated(version, code_sha256, arn)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_settings_follow_flag() {
        let mut functions = FunctionsConfig::default();
        assert!(CreateSettings::from_config(&functions).is_none());

        functions.create_missing = true;
        functions.execution_role_arn = Some(String::from("arn:aws:iam::1:role/exec"));
        let settings = CreateSettings::from_config(&functions).unwrap();
        assert_eq!(settings.runtime, "python3.8");
        assert_eq!(settings.handler, "lambda_function.lambda_handler");
        assert_eq!(settings.execution_role_arn.as_deref(), Some("arn:aws:iam::1:role/exec"));
    }

    #[test]
    fn test_created_outcome() {
        let outcome = DeployOutcome::created(Some("1"), None, Some("arn:aws:lambda:us-east-1:1:function:alpha"));
        assert_eq!(outcome.action, DeployAction::Created);
        assert_eq!(outcome.version.as_deref(), Some("1"));
        assert_eq!(outcome.action.to_string(), "created");
    }
}
