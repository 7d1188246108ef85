//! Deployment orchestrator.
//!
//! Drives a change set through build and upload, one unit at a time, in
//! name order. Under the default fail-fast policy the first failure ends
//! the run and every later unit is reported as skipped.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::changeset::{ChangeSet, UnitName};
use crate::config::FailurePolicy;
use crate::error::{FnshipError, Result};
use crate::lambda::FunctionDeployer;
use crate::package::{Archive, PackageBuilder};

use super::report::{DeployPhase, DeploymentReport, DeploymentResult, RunOutcome, UnitStatus};

/// Orchestrator state, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Not started.
    Idle,
    /// Processing units.
    Deploying,
    /// All work finished.
    Done,
    /// Stopped after a failure.
    Aborted,
}

/// Sequential, fail-fast deployment of a change set.
pub struct DeploymentOrchestrator<'a, D: FunctionDeployer + ?Sized> {
    /// Archive builder.
    builder: &'a PackageBuilder,
    /// Remote deployer.
    deployer: &'a D,
    /// Directory holding one subdirectory per unit.
    units_root: PathBuf,
    /// Failure policy.
    policy: FailurePolicy,
}

impl<'a, D: FunctionDeployer + ?Sized> DeploymentOrchestrator<'a, D> {
    /// Creates an orchestrator with the fail-fast policy.
    #[must_use]
    pub fn new(builder: &'a PackageBuilder, deployer: &'a D, units_root: impl Into<PathBuf>) -> Self {
        Self {
            builder,
            deployer,
            units_root: units_root.into(),
            policy: FailurePolicy::FailFast,
        }
    }

    /// Sets the failure policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Deploys every unit of `changes`.
    ///
    /// Unit failures do not make this return `Err`; they are recorded in
    /// the report, whose [`DeploymentReport::failure`] turns them into the
    /// process error.
    ///
    /// # Errors
    ///
    /// Returns an error only if a build task cannot be joined.
    pub async fn run(&self, changes: &ChangeSet) -> Result<DeploymentReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("deploy", run = %run_id);

        let (outcome, results) = self.run_units(changes).instrument(span).await?;

        Ok(DeploymentReport {
            run_id,
            runner: runner_host(),
            policy: self.policy,
            outcome,
            started_at,
            finished_at: Utc::now(),
            results,
        })
    }

    async fn run_units(&self, changes: &ChangeSet) -> Result<(RunOutcome, Vec<DeploymentResult>)> {
        let mut state = RunState::Idle;
        debug!("State: {state:?}");

        if changes.is_empty() {
            info!("No changed units, nothing to deploy");
            return Ok((RunOutcome::NothingToDeploy, Vec::new()));
        }

        state = RunState::Deploying;
        info!(
            "Deploying {} unit(s) [{changes}] with policy {}",
            changes.len(),
            self.policy
        );
        debug!("State: {state:?}");

        let mut results = Vec::with_capacity(changes.len());
        let mut remaining = changes.iter();

        for unit in remaining.by_ref() {
            let result = self.deploy_unit(unit).await?;
            let failed = result.status == UnitStatus::Failed;
            results.push(result);

            if failed && self.policy == FailurePolicy::FailFast {
                state = RunState::Aborted;
                break;
            }
        }

        let skipped: Vec<DeploymentResult> =
            remaining.cloned().map(DeploymentResult::skipped).collect();
        if !skipped.is_empty() {
            warn!(
                "Aborting run, {} unit(s) not attempted: {}",
                skipped.len(),
                skipped
                    .iter()
                    .map(|r| r.unit.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        results.extend(skipped);

        let any_failed = results.iter().any(|r| r.status == UnitStatus::Failed);
        let outcome = match state {
            RunState::Aborted => RunOutcome::Aborted,
            _ if any_failed => RunOutcome::CompletedWithFailures,
            _ => RunOutcome::Deployed,
        };
        if state != RunState::Aborted {
            state = RunState::Done;
        }
        debug!("State: {state:?}");

        Ok((outcome, results))
    }

    /// Builds then deploys one unit. Only a join failure is returned as `Err`.
    async fn deploy_unit(&self, unit: &UnitName) -> Result<DeploymentResult> {
        let started = Instant::now();

        info!(unit = %unit, phase = %DeployPhase::Building, "Building package");
        let archive = match self.build(unit).await? {
            Ok(archive) => archive,
            Err(e) => {
                error!(unit = %unit, phase = %DeployPhase::Building, "Build failed: {e}");
                return Ok(DeploymentResult::failed(
                    unit.clone(),
                    DeployPhase::Building,
                    &e,
                    None,
                    elapsed_ms(started),
                ));
            }
        };
        info!(
            unit = %unit,
            phase = %DeployPhase::Building,
            "Built {} ({} bytes)",
            archive.path.display(),
            archive.size_bytes
        );

        info!(unit = %unit, phase = %DeployPhase::Uploading, "Uploading package");
        match self.deployer.deploy(unit, &archive).await {
            Ok(outcome) => {
                info!(
                    unit = %unit,
                    phase = %DeployPhase::Uploading,
                    "Deployed ({}, version {})",
                    outcome.action,
                    outcome.version.as_deref().unwrap_or("unknown")
                );
                Ok(DeploymentResult::succeeded(
                    unit.clone(),
                    archive.sha256,
                    outcome,
                    elapsed_ms(started),
                ))
            }
            Err(e) => {
                error!(unit = %unit, phase = %DeployPhase::Uploading, "Deploy failed: {e}");
                Ok(DeploymentResult::failed(
                    unit.clone(),
                    DeployPhase::Uploading,
                    &e,
                    Some(archive.sha256),
                    elapsed_ms(started),
                ))
            }
        }
    }

    /// Runs the blocking build off the async worker. The outer `Result`
    /// is the join, the inner one the build itself.
    async fn build(&self, unit: &UnitName) -> Result<Result<Archive>> {
        let builder = self.builder.clone();
        let unit = unit.clone();
        let dir = self.units_root.join(unit.as_str());

        tokio::task::spawn_blocking(move || builder.build(&unit, &dir))
            .await
            .map_err(|e| FnshipError::internal(format!("Build task failed: {e}")))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn runner_host() -> String {
    hostname::get().map_or_else(
        |_| String::from("unknown"),
        |h| h.to_string_lossy().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployError;
    use crate::lambda::DeployOutcome;
    use async_trait::async_trait;
    use mockall::{Sequence, mock};
    use std::fs;
    use tempfile::TempDir;

    mock! {
        Deployer {}

        #[async_trait]
        impl FunctionDeployer for Deployer {
            async fn deploy(&self, unit: &UnitName, archive: &Archive) -> Result<DeployOutcome>;
        }
    }

    fn unit(name: &str) -> UnitName {
        UnitName::new(name).unwrap()
    }

    fn set(names: &[&str]) -> ChangeSet {
        names.iter().map(|n| unit(n)).collect()
    }

    /// Creates `<temp>/functions/<unit>/lambda_function.py` for each name.
    fn workspace(names: &[&str]) -> (TempDir, PackageBuilder, PathBuf) {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path().join("functions");
        for name in names {
            let dir = root.join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("lambda_function.py"), format!("NAME = '{name}'\n")).unwrap();
        }
        let builder = PackageBuilder::new(temp.path().join("artifacts"));
        (temp, builder, root)
    }

    fn ok_outcome() -> Result<DeployOutcome> {
        Ok(DeployOutcome::updated(Some("7"), Some("abc="), None))
    }

    fn expect_unit(
        mock: &mut MockDeployer,
        seq: &mut Sequence,
        name: &'static str,
        result: fn() -> Result<DeployOutcome>,
    ) {
        mock.expect_deploy()
            .withf(move |u, _| u.as_str() == name)
            .times(1)
            .in_sequence(seq)
            .returning(move |_, _| result());
    }

    #[tokio::test]
    async fn test_empty_change_set_does_nothing() {
        let (_temp, builder, root) = workspace(&[]);
        let mut deployer = MockDeployer::new();
        deployer.expect_deploy().never();

        let orchestrator = DeploymentOrchestrator::new(&builder, &deployer, root);
        let report = orchestrator.run(&ChangeSet::new()).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::NothingToDeploy);
        assert!(report.results.is_empty());
        assert!(report.is_success());
        assert!(report.failure().is_none());
    }

    #[tokio::test]
    async fn test_deploys_all_units_in_order() {
        let (_temp, builder, root) = workspace(&["beta", "alpha"]);
        let mut deployer = MockDeployer::new();
        let mut seq = Sequence::new();
        expect_unit(&mut deployer, &mut seq, "alpha", ok_outcome);
        expect_unit(&mut deployer, &mut seq, "beta", ok_outcome);

        let orchestrator = DeploymentOrchestrator::new(&builder, &deployer, root);
        let report = orchestrator.run(&set(&["beta", "alpha"])).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Deployed);
        assert_eq!(report.succeeded(), 2);
        let order: Vec<&str> = report.results.iter().map(|r| r.unit.as_str()).collect();
        assert_eq!(order, vec!["alpha", "beta"]);
        assert!(report.results.iter().all(|r| r.archive_sha256.is_some()));
    }

    #[tokio::test]
    async fn test_fail_fast_stops_after_failing_unit() {
        let (_temp, builder, root) = workspace(&["alpha", "beta", "gamma"]);
        let mut deployer = MockDeployer::new();
        let mut seq = Sequence::new();
        expect_unit(&mut deployer, &mut seq, "alpha", ok_outcome);
        expect_unit(&mut deployer, &mut seq, "beta", || {
            Err(DeployError::api("beta", Some("ResourceNotFoundException"), "Function not found: beta").into())
        });
        deployer
            .expect_deploy()
            .withf(|u, _| u.as_str() == "gamma")
            .never();

        let orchestrator = DeploymentOrchestrator::new(&builder, &deployer, root);
        let report = orchestrator
            .run(&set(&["alpha", "beta", "gamma"]))
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::Aborted);
        assert_eq!(report.results[0].status, UnitStatus::Succeeded);
        assert_eq!(report.results[1].status, UnitStatus::Failed);
        assert_eq!(report.results[1].phase, Some(DeployPhase::Uploading));
        assert!(
            report.results[1]
                .error
                .as_deref()
                .unwrap()
                .contains("ResourceNotFoundException")
        );
        assert_eq!(report.results[2].status, UnitStatus::Skipped);
        assert!(!report.is_success());

        let err = report.failure().unwrap();
        assert!(matches!(
            err,
            FnshipError::Deploy(DeployError::Aborted { ref unit, .. }) if unit == "beta"
        ));
    }

    #[tokio::test]
    async fn test_build_failure_skips_upload() {
        // "alpha" has no directory on disk
        let (_temp, builder, root) = workspace(&["beta"]);
        let mut deployer = MockDeployer::new();
        deployer.expect_deploy().never();

        let orchestrator = DeploymentOrchestrator::new(&builder, &deployer, root);
        let report = orchestrator.run(&set(&["alpha", "beta"])).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Aborted);
        assert_eq!(report.results[0].phase, Some(DeployPhase::Building));
        assert!(report.results[0].error.as_deref().unwrap().contains("not found"));
        assert_eq!(report.results[1].status, UnitStatus::Skipped);
    }

    #[tokio::test]
    async fn test_continue_on_error_attempts_every_unit() {
        let (_temp, builder, root) = workspace(&["alpha", "beta", "gamma"]);
        let mut deployer = MockDeployer::new();
        let mut seq = Sequence::new();
        expect_unit(&mut deployer, &mut seq, "alpha", || {
            Err(DeployError::api("alpha", Some("TooManyRequestsException"), "Rate exceeded").into())
        });
        expect_unit(&mut deployer, &mut seq, "beta", ok_outcome);
        expect_unit(&mut deployer, &mut seq, "gamma", || {
            Err(DeployError::not_found("gamma", Some("ResourceNotFoundException"), "Function not found").into())
        });

        let orchestrator = DeploymentOrchestrator::new(&builder, &deployer, root)
            .with_policy(FailurePolicy::ContinueOnError);
        let report = orchestrator
            .run(&set(&["alpha", "beta", "gamma"]))
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::CompletedWithFailures);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.skipped(), 0);

        let err = report.failure().unwrap();
        assert_eq!(err.to_string(), "Deployment error: 2 of 3 unit(s) failed: alpha, gamma");
    }

    #[tokio::test]
    async fn test_units_read_back_from_json_are_deployed() {
        let (_temp, builder, root) = workspace(&["getRepoDetails", "read_Files"]);
        let json = set(&["read_Files", "getRepoDetails"]).to_json().unwrap();
        let parsed = ChangeSet::from_json(&json).unwrap();

        let mut deployer = MockDeployer::new();
        let mut seq = Sequence::new();
        expect_unit(&mut deployer, &mut seq, "getRepoDetails", ok_outcome);
        expect_unit(&mut deployer, &mut seq, "read_Files", ok_outcome);

        let orchestrator = DeploymentOrchestrator::new(&builder, &deployer, root);
        let report = orchestrator.run(&parsed).await.unwrap();

        let deployed: Vec<&str> = report.results.iter().map(|r| r.unit.as_str()).collect();
        assert_eq!(deployed, parsed.names());
    }
}
