//! Configuration parser for loading and merging configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling. Environment values
//! win over the file, which wins over the built-in defaults.

use crate::error::{ConfigError, FnshipError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::FnshipConfig;

/// Configuration parser for loading fnship configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path used to locate the `.env` file.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<FnshipConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(FnshipError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            FnshipError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<FnshipConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(FnshipConfig::default());
        }

        serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            FnshipError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })
    }

    /// Loads the given file, or the first default file found from the
    /// current directory upward, or the defaults when there is none.
    /// Environment overrides are applied in every case.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file is missing, or if a
    /// found file cannot be parsed.
    pub fn load_or_default(&self, path: Option<&Path>) -> Result<FnshipConfig> {
        let mut config = match path {
            Some(explicit) => self.load_file(explicit)?,
            None => match find_config_file(".") {
                Some(found) => self.load_file(found)?,
                None => {
                    debug!("No configuration file found, using defaults");
                    FnshipConfig::default()
                }
            },
        };

        Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok());

        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    ///
    /// Variable names follow the CI scripts this tool replaces, so an
    /// existing pipeline keeps working without a config file.
    pub fn apply_env_overrides<F>(config: &mut FnshipConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(region) = get("AWS_REGION") {
            debug!("Overriding aws.region from environment");
            config.aws.region = region;
        }

        if let Some(root) = get("FNSHIP_WATCHED_ROOT") {
            debug!("Overriding functions.watched_root from environment");
            config.functions.watched_root = PathBuf::from(root);
        }

        if let Some(role) = get("LAMBDA_EXECUTION_ROLE_ARN") {
            debug!("Overriding functions.execution_role_arn from environment");
            config.functions.execution_role_arn = Some(role);
        }

        if let Some(runtime) = get("LAMBDA_RUNTIME") {
            debug!("Overriding functions.runtime from environment");
            config.functions.runtime = runtime;
        }

        if let Some(handler) = get("LAMBDA_HANDLER") {
            debug!("Overriding functions.handler from environment");
            config.functions.handler = handler;
        }

        if let Some(bucket) = get("S3_BUCKET") {
            debug!("Overriding sync.bucket from environment");
            config.sync.bucket = Some(bucket);
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                FnshipError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["fnship.yaml", "fnship.yml", ".fnship.yaml"];

/// Finds the configuration file in the given directory or its parents.
#[must_use]
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Option<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = std::fs::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Some(config_path);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailurePolicy;
    use std::collections::HashMap;

    #[test]
    fn test_parse_empty_config() {
        let parser = ConfigParser::new();
        let config = parser.parse_yaml("", None).unwrap();
        assert_eq!(config, FnshipConfig::default());
    }

    #[test]
    fn test_parse_partial_config() {
        let yaml = r"
functions:
  watched_root: lambdas
  failure_policy: continue_on_error
aws:
  region: eu-west-3
";
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(config.functions.watched_root, PathBuf::from("lambdas"));
        assert_eq!(config.functions.failure_policy, FailurePolicy::ContinueOnError);
        assert_eq!(config.functions.handler, "lambda_function.lambda_handler");
        assert_eq!(config.aws.region, "eu-west-3");
        assert_eq!(config.sync.local_dir, PathBuf::from("DaveBucket"));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let parser = ConfigParser::new();
        let result = parser.parse_yaml("functions: [unterminated", None);
        assert!(matches!(
            result,
            Err(FnshipError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("AWS_REGION", "ap-south-1"),
            ("LAMBDA_EXECUTION_ROLE_ARN", "arn:aws:iam::123456789012:role/lambda-exec"),
            ("LAMBDA_RUNTIME", "python3.12"),
            ("LAMBDA_HANDLER", ""),
            ("S3_BUCKET", "dave-bucket"),
        ]
        .into_iter()
        .collect();

        let mut config = FnshipConfig::default();
        ConfigParser::apply_env_overrides(&mut config, |name| {
            env.get(name).map(|v| (*v).to_string())
        });

        assert_eq!(config.aws.region, "ap-south-1");
        assert_eq!(config.functions.runtime, "python3.12");
        // empty values are ignored
        assert_eq!(config.functions.handler, "lambda_function.lambda_handler");
        assert_eq!(
            config.functions.execution_role_arn.as_deref(),
            Some("arn:aws:iam::123456789012:role/lambda-exec")
        );
        assert_eq!(config.sync.bucket.as_deref(), Some("dave-bucket"));
    }

    #[test]
    fn test_find_config_file_in_parent() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("fnship.yaml"), "").unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(
            found.canonicalize().unwrap(),
            temp.path().join("fnship.yaml").canonicalize().unwrap()
        );
    }
}
