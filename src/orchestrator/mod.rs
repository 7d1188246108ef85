//! Deployment orchestration module.
//!
//! This module drives a resolved change set through packaging and upload:
//! - [`DeploymentOrchestrator`] runs units sequentially with a failure policy
//! - [`DeploymentReport`] records what happened to every unit

mod report;
mod runner;

pub use report::{DeployPhase, DeploymentReport, DeploymentResult, RunOutcome, UnitStatus};
pub use runner::{DeploymentOrchestrator, RunState};
