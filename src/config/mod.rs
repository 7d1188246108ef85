//! Configuration module for fnship.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `fnship.yaml`
//! - Environment variable overrides and `.env` loading
//! - Validation of configuration values

mod parser;
mod spec;
mod validator;

pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use spec::{
    AwsConfig, DEFAULT_ARTIFACT_DIR, DEFAULT_HANDLER, DEFAULT_REGION, DEFAULT_RUNTIME,
    DEFAULT_SYNC_DIR, DEFAULT_WATCHED_ROOT, FailurePolicy, FnshipConfig, FunctionsConfig,
    SyncConfig,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
