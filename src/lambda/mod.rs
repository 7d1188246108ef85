//! AWS Lambda integration.
//!
//! This module provides the [`FunctionDeployer`] seam used by the
//! orchestrator and its Lambda implementation.

mod client;
mod types;

pub use client::{FunctionDeployer, LambdaDeployer};
pub use types::{CreateSettings, DeployAction, DeployOutcome};
