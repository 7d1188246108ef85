//! Per-unit results and the run report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::changeset::UnitName;
use crate::config::FailurePolicy;
use crate::error::{DeployError, FnshipError};
use crate::lambda::DeployOutcome;

/// Sub-step a unit was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployPhase {
    /// Packaging the unit directory.
    Building,
    /// Uploading the archive.
    Uploading,
}

/// Final status of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    /// Built and deployed.
    Succeeded,
    /// Build or deployment failed.
    Failed,
    /// Never attempted because the run was aborted earlier.
    Skipped,
}

/// How the whole run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The change set was empty.
    NothingToDeploy,
    /// Every unit deployed.
    Deployed,
    /// A unit failed and the remaining units were skipped.
    Aborted,
    /// Every unit was attempted and at least one failed.
    CompletedWithFailures,
}

/// Outcome for one unit.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentResult {
    /// Unit name.
    pub unit: UnitName,
    /// Final status.
    pub status: UnitStatus,
    /// Last phase entered, `None` for skipped units.
    pub phase: Option<DeployPhase>,
    /// Error detail for failed units.
    pub error: Option<String>,
    /// Hex sha256 of the uploaded archive.
    pub archive_sha256: Option<String>,
    /// Remote outcome for succeeded units.
    pub outcome: Option<DeployOutcome>,
    /// Wall time spent on this unit.
    pub duration_ms: u64,
}

/// Report of one orchestrator run.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    /// Unique run identifier, present in every log line of the run.
    pub run_id: Uuid,
    /// Host the run executed on.
    pub runner: String,
    /// Failure policy in effect.
    pub policy: FailurePolicy,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Per-unit results in processing order.
    pub results: Vec<DeploymentResult>,
}

impl DeploymentResult {
    /// Result for a unit that was built and deployed.
    #[must_use]
    pub const fn succeeded(
        unit: UnitName,
        archive_sha256: String,
        outcome: DeployOutcome,
        duration_ms: u64,
    ) -> Self {
        Self {
            unit,
            status: UnitStatus::Succeeded,
            phase: Some(DeployPhase::Uploading),
            error: None,
            archive_sha256: Some(archive_sha256),
            outcome: Some(outcome),
            duration_ms,
        }
    }

    /// Result for a unit that failed in `phase`.
    #[must_use]
    pub fn failed(
        unit: UnitName,
        phase: DeployPhase,
        error: &FnshipError,
        archive_sha256: Option<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            unit,
            status: UnitStatus::Failed,
            phase: Some(phase),
            error: Some(error.to_string()),
            archive_sha256,
            outcome: None,
            duration_ms,
        }
    }

    /// Result for a unit that was never attempted.
    #[must_use]
    pub const fn skipped(unit: UnitName) -> Self {
        Self {
            unit,
            status: UnitStatus::Skipped,
            phase: None,
            error: None,
            archive_sha256: None,
            outcome: None,
            duration_ms: 0,
        }
    }
}

impl DeploymentReport {
    /// Number of succeeded units.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(UnitStatus::Succeeded)
    }

    /// Number of failed units.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(UnitStatus::Failed)
    }

    /// Number of skipped units.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(UnitStatus::Skipped)
    }

    /// Returns true if nothing failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::NothingToDeploy | RunOutcome::Deployed)
    }

    /// Returns the first failed unit.
    #[must_use]
    pub fn first_failure(&self) -> Option<&DeploymentResult> {
        self.results
            .iter()
            .find(|r| r.status == UnitStatus::Failed)
    }

    /// Converts a failed run into the error the process exits with.
    #[must_use]
    pub fn failure(&self) -> Option<FnshipError> {
        match self.outcome {
            RunOutcome::NothingToDeploy | RunOutcome::Deployed => None,
            RunOutcome::Aborted => {
                let failed = self.first_failure()?;
                Some(FnshipError::Deploy(DeployError::Aborted {
                    unit: failed.unit.to_string(),
                    phase: failed
                        .phase
                        .map_or_else(String::new, |p| p.to_string()),
                    message: failed.error.clone().unwrap_or_default(),
                }))
            }
            RunOutcome::CompletedWithFailures => {
                Some(FnshipError::Deploy(DeployError::PartialFailure {
                    failed: self
                        .results
                        .iter()
                        .filter(|r| r.status == UnitStatus::Failed)
                        .map(|r| r.unit.to_string())
                        .collect(),
                    total: self.results.len(),
                }))
            }
        }
    }

    fn count(&self, status: UnitStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building => write!(f, "building"),
            Self::Uploading => write!(f, "uploading"),
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl fmt::Display for DeploymentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} unit(s): {} succeeded, {} failed, {} skipped",
            self.results.len(),
            self.succeeded(),
            self.failed(),
            self.skipped()
        )
    }
}
