//! AWS Lambda deployment client.
//!
//! Credentials come from the ambient AWS chain (in CI, the federated
//! short-lived session exported by the OIDC step). This client never
//! refreshes or exchanges them.

use async_trait::async_trait;
use aws_sdk_lambda::Client;
use aws_sdk_lambda::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{FunctionCode, Runtime};
use tracing::{debug, info};

use crate::changeset::UnitName;
use crate::error::{DeployError, FnshipError, Result};
use crate::package::Archive;

use super::types::{CreateSettings, DeployOutcome};

/// Pushes an archive to the function named after the unit.
#[async_trait]
pub trait FunctionDeployer: Send + Sync {
    /// Deploys `archive` as the code of function `unit`.
    async fn deploy(&self, unit: &UnitName, archive: &Archive) -> Result<DeployOutcome>;
}

/// Lambda-backed deployer.
#[derive(Debug, Clone)]
pub struct LambdaDeployer {
    /// Lambda client.
    client: Client,
    /// Region the client talks to.
    region: String,
    /// Creation settings, when missing functions may be created.
    create: Option<CreateSettings>,
}

impl LambdaDeployer {
    /// Creates a deployer for `region` from the ambient credential chain.
    pub async fn from_env(region: &str) -> Self {
        let config = aws_config::from_env()
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self::with_client(Client::new(&config), region)
    }

    /// Creates a deployer with an existing client.
    #[must_use]
    pub fn with_client(client: Client, region: &str) -> Self {
        Self {
            client,
            region: region.to_string(),
            create: None,
        }
    }

    /// Enables creation of functions that do not exist yet.
    #[must_use]
    pub fn with_create_settings(mut self, create: Option<CreateSettings>) -> Self {
        self.create = create;
        self
    }

    /// Returns the region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Checks whether the function exists.
    async fn function_exists(&self, name: &str) -> Result<bool> {
        match self.client.get_function().function_name(name).send().await {
            Ok(_) => Ok(true),
            Err(sdk_err) => {
                let service_err = sdk_err.into_service_error();
                if service_err.is_resource_not_found_exception() {
                    Ok(false)
                } else {
                    Err(service_error(name, &service_err).into())
                }
            }
        }
    }

    /// Replaces the code of an existing function.
    async fn update_code(&self, name: &str, code: Vec<u8>) -> Result<DeployOutcome> {
        info!("Updating function code: {name}");

        let output = self
            .client
            .update_function_code()
            .function_name(name)
            .zip_file(Blob::new(code))
            .send()
            .await
            .map_err(|sdk_err| {
                let service_err = sdk_err.into_service_error();
                if service_err.is_resource_not_found_exception() {
                    let message = service_err.message().unwrap_or_default().to_string();
                    DeployError::not_found(name, service_err.code(), message)
                } else {
                    service_error(name, &service_err)
                }
            })?;

        Ok(DeployOutcome::updated(
            output.version(),
            output.code_sha256(),
            output.function_arn(),
        ))
    }

    /// Creates a new function from the archive.
    async fn create_function(
        &self,
        name: &str,
        code: Vec<u8>,
        settings: &CreateSettings,
    ) -> Result<DeployOutcome> {
        let Some(role) = settings.execution_role_arn.as_deref() else {
            return Err(DeployError::MissingExecutionRole {
                function: name.to_string(),
            }
            .into());
        };

        info!(
            "Creating function {name} (runtime {}, handler {})",
            settings.runtime, settings.handler
        );

        let output = self
            .client
            .create_function()
            .function_name(name)
            .runtime(Runtime::from(settings.runtime.as_str()))
            .role(role)
            .handler(&settings.handler)
            .code(FunctionCode::builder().zip_file(Blob::new(code)).build())
            .publish(true)
            .send()
            .await
            .map_err(|sdk_err| service_error(name, &sdk_err.into_service_error()))?;

        Ok(DeployOutcome::created(
            output.version(),
            output.code_sha256(),
            output.function_arn(),
        ))
    }
}

#[async_trait]
impl FunctionDeployer for LambdaDeployer {
    async fn deploy(&self, unit: &UnitName, archive: &Archive) -> Result<DeployOutcome> {
        let name = unit.as_str();
        let code = tokio::fs::read(&archive.path).await.map_err(|e| {
            FnshipError::Deploy(DeployError::ArchiveRead {
                path: archive.path.clone(),
                message: e.to_string(),
            })
        })?;
        debug!("Read {} bytes from {}", code.len(), archive.path.display());

        if let Some(settings) = &self.create
            && !self.function_exists(name).await?
        {
            return self.create_function(name, code, settings).await;
        }

        self.update_code(name, code).await
    }
}

/// Carries a service error's code and message through unchanged.
fn service_error<E>(function: &str, err: &E) -> DeployError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(err).to_string(), str::to_string);
    DeployError::api(function, err.code(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lambda::DeployAction;
    use aws_sdk_lambda::error::ErrorMetadata;
    use aws_sdk_lambda::operation::create_function::CreateFunctionOutput;
    use aws_sdk_lambda::operation::get_function::GetFunctionError;
    use aws_sdk_lambda::operation::update_function_code::{
        UpdateFunctionCodeError, UpdateFunctionCodeOutput,
    };
    use aws_sdk_lambda::types::error::ResourceNotFoundException;
    use aws_smithy_mocks::{RuleMode, mock, mock_client};
    use std::fs;
    use tempfile::TempDir;

    const NOT_FOUND_MESSAGE: &str =
        "Function not found: arn:aws:lambda:us-east-1:123456789012:function:alpha";

    fn not_found() -> ResourceNotFoundException {
        ResourceNotFoundException::builder()
            .message(NOT_FOUND_MESSAGE)
            .meta(
                ErrorMetadata::builder()
                    .code("ResourceNotFoundException")
                    .message(NOT_FOUND_MESSAGE)
                    .build(),
            )
            .build()
    }

    fn archive(temp: &TempDir) -> Archive {
        let path = temp.path().join("alpha.zip");
        fs::write(&path, b"PK\x05\x06").unwrap();
        Archive {
            unit: UnitName::new("alpha").unwrap(),
            path,
            size_bytes: 4,
            file_count: 1,
            sha256: String::from("00"),
        }
    }

    fn create_settings(role: Option<&str>) -> Option<CreateSettings> {
        Some(CreateSettings {
            runtime: String::from("python3.8"),
            handler: String::from("lambda_function.lambda_handler"),
            execution_role_arn: role.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_update_existing_function() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let archive = archive(&temp);

        let update = mock!(Client::update_function_code)
            .match_requests(|req| req.function_name() == Some("alpha") && req.zip_file().is_some())
            .then_output(|| {
                UpdateFunctionCodeOutput::builder()
                    .version("$LATEST")
                    .code_sha256("abc=")
                    .build()
            });
        let client = mock_client!(aws_sdk_lambda, [&update]);

        let deployer = LambdaDeployer::with_client(client, "us-east-1");
        let outcome = deployer.deploy(&archive.unit, &archive).await.unwrap();

        assert_eq!(outcome.action, DeployAction::Updated);
        assert_eq!(outcome.version.as_deref(), Some("$LATEST"));
        assert_eq!(update.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_update_not_found_keeps_service_detail() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let archive = archive(&temp);

        let update = mock!(Client::update_function_code)
            .then_error(|| UpdateFunctionCodeError::ResourceNotFoundException(not_found()));
        let client = mock_client!(aws_sdk_lambda, [&update]);

        let err = LambdaDeployer::with_client(client, "us-east-1")
            .deploy(&archive.unit, &archive)
            .await
            .unwrap_err();

        match err {
            FnshipError::Deploy(DeployError::FunctionNotFound {
                function,
                code,
                message,
            }) => {
                assert_eq!(function, "alpha");
                assert_eq!(code.as_deref(), Some("ResourceNotFoundException"));
                assert_eq!(message, NOT_FOUND_MESSAGE);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_function_is_created() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let archive = archive(&temp);

        let get = mock!(Client::get_function)
            .then_error(|| GetFunctionError::ResourceNotFoundException(not_found()));
        let create = mock!(Client::create_function)
            .match_requests(|req| {
                req.function_name() == Some("alpha")
                    && req.role() == Some("arn:aws:iam::123456789012:role/lambda-exec")
                    && req.handler() == Some("lambda_function.lambda_handler")
                    && req.publish() == Some(true)
            })
            .then_output(|| CreateFunctionOutput::builder().version("1").build());
        let update = mock!(Client::update_function_code)
            .then_output(|| UpdateFunctionCodeOutput::builder().build());
        let client = mock_client!(aws_sdk_lambda, RuleMode::MatchAny, [&get, &create, &update]);

        let deployer = LambdaDeployer::with_client(client, "us-east-1").with_create_settings(
            create_settings(Some("arn:aws:iam::123456789012:role/lambda-exec")),
        );
        let outcome = deployer.deploy(&archive.unit, &archive).await.unwrap();

        assert_eq!(outcome.action, DeployAction::Created);
        assert_eq!(outcome.version.as_deref(), Some("1"));
        assert_eq!(get.num_calls(), 1);
        assert_eq!(create.num_calls(), 1);
        assert_eq!(update.num_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_without_role_fails_before_calling_create() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let archive = archive(&temp);

        let get = mock!(Client::get_function)
            .then_error(|| GetFunctionError::ResourceNotFoundException(not_found()));
        let create = mock!(Client::create_function)
            .then_output(|| CreateFunctionOutput::builder().build());
        let client = mock_client!(aws_sdk_lambda, RuleMode::MatchAny, [&get, &create]);

        let err = LambdaDeployer::with_client(client, "us-east-1")
            .with_create_settings(create_settings(None))
            .deploy(&archive.unit, &archive)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FnshipError::Deploy(DeployError::MissingExecutionRole { ref function }) if function == "alpha"
        ));
        assert_eq!(create.num_calls(), 0);
    }

    #[test]
    fn test_service_error_is_verbatim() {
        let meta = ErrorMetadata::builder()
            .code("AccessDeniedException")
            .message("User is not authorized to perform: lambda:UpdateFunctionCode")
            .build();

        let err = service_error("alpha", &meta);
        match err {
            DeployError::Api {
                function,
                code,
                message,
            } => {
                assert_eq!(function, "alpha");
                assert_eq!(code.as_deref(), Some("AccessDeniedException"));
                assert_eq!(
                    message,
                    "User is not authorized to perform: lambda:UpdateFunctionCode"
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_service_error_without_message() {
        let meta = ErrorMetadata::builder().code("ServiceException").build();
        let err = service_error("beta", &meta);
        assert!(err.to_string().contains("[ServiceException]"));
    }
}
