//! Output formatting for CLI commands.
//!
//! Formatters return strings; the caller decides where they go. The
//! `resolve` command bypasses this and prints bare JSON.

use colored::Colorize;
use std::fmt::Write;
use std::path::Path;
use tabled::{Table, Tabled};

use crate::changeset::ChangeSet;
use crate::config::{FnshipConfig, ValidationResult};
use crate::orchestrator::{DeploymentReport, RunOutcome, UnitStatus};
use crate::sync::{SyncReport, UploadReason};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Planned unit row for table display.
#[derive(Tabled)]
struct PlannedUnitRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Function")]
    unit: String,
    #[tabled(rename = "Source")]
    source: String,
}

/// Unit result row for table display.
#[derive(Tabled)]
struct UnitResultRow {
    #[tabled(rename = "Function")]
    unit: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Time")]
    duration: String,
}

/// Sync action row for table display.
#[derive(Tabled)]
struct SyncActionRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Key")]
    key: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the units a deploy would process.
    #[must_use]
    pub fn format_plan(&self, changes: &ChangeSet, units_root: &Path) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "units": changes,
                "units_root": units_root,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => Self::format_plan_text(changes, units_root),
        }
    }

    fn format_plan_text(changes: &ChangeSet, units_root: &Path) -> String {
        if changes.is_empty() {
            return format!("{} No changed functions, nothing to deploy.\n", "✓".green());
        }

        let mut output = String::from("\n📋 Deployment Plan\n\n");

        let rows: Vec<PlannedUnitRow> = changes
            .iter()
            .enumerate()
            .map(|(i, unit)| PlannedUnitRow {
                index: i + 1,
                unit: unit.to_string(),
                source: units_root.join(unit.as_str()).display().to_string(),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = write!(
            output,
            "\nPlan: {} function(s) to deploy\n",
            changes.len().to_string().yellow()
        );
        output
    }

    /// Formats a deployment report.
    #[must_use]
    pub fn format_report(&self, report: &DeploymentReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_report_text(report),
        }
    }

    fn format_report_text(report: &DeploymentReport) -> String {
        if report.outcome == RunOutcome::NothingToDeploy {
            return format!("{} No changed functions, nothing to deploy.\n", "✓".green());
        }

        let mut output = String::new();
        let _ = write!(
            output,
            "\n🚀 Deployment {} on {}\n\n",
            report.run_id, report.runner
        );

        let rows: Vec<UnitResultRow> = report
            .results
            .iter()
            .map(|r| UnitResultRow {
                unit: r.unit.to_string(),
                status: Self::format_status(r.status),
                action: r
                    .outcome
                    .as_ref()
                    .map_or_else(|| String::from("-"), |o| o.action.to_string()),
                version: r
                    .outcome
                    .as_ref()
                    .and_then(|o| o.version.clone())
                    .unwrap_or_else(|| String::from("-")),
                duration: format!("{}ms", r.duration_ms),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let failures: Vec<_> = report
            .results
            .iter()
            .filter(|r| r.status == UnitStatus::Failed)
            .collect();
        if !failures.is_empty() {
            let _ = write!(output, "\n{} Errors:\n", "⚠".yellow());
            for failed in failures {
                let _ = writeln!(
                    output,
                    "   - {} ({}): {}",
                    failed.unit,
                    failed.phase.map_or_else(String::new, |p| p.to_string()),
                    failed.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        let status = if report.is_success() {
            format!("{} {report}", "✓".green())
        } else {
            format!("{} {report}", "✗".red())
        };
        let _ = write!(output, "\n{status}\n");
        output
    }

    /// Formats a sync report.
    #[must_use]
    pub fn format_sync(&self, report: &SyncReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_sync_text(report),
        }
    }

    fn format_sync_text(report: &SyncReport) -> String {
        let plan = &report.plan;
        if plan.is_empty() {
            return format!(
                "{} {} is up to date ({} file(s)).\n",
                "✓".green(),
                report.location,
                plan.unchanged
            );
        }

        let mut output = String::new();
        let _ = write!(
            output,
            "\n🪣 Sync {} -> {}\n\n",
            report.local_dir.display(),
            report.location
        );

        let rows: Vec<SyncActionRow> = plan
            .uploads
            .iter()
            .map(|u| SyncActionRow {
                action: match u.reason {
                    UploadReason::New => "+upload".green().to_string(),
                    UploadReason::Modified => "~upload".yellow().to_string(),
                },
                key: u.key.clone(),
            })
            .chain(plan.deletes.iter().map(|key| SyncActionRow {
                action: "-delete".red().to_string(),
                key: key.clone(),
            }))
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = write!(output, "\nPlan: {plan}\n");
        if report.dry_run {
            let _ = writeln!(output, "{} Dry run, bucket not modified.", "⚠".yellow());
        } else {
            let _ = writeln!(
                output,
                "{} Uploaded {}, deleted {}.",
                "✓".green(),
                report.uploaded,
                report.deleted
            );
        }
        output
    }

    /// Formats a validation result together with the effective configuration.
    #[must_use]
    pub fn format_validation(
        &self,
        config: &FnshipConfig,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "valid": result.is_valid(),
                "errors": result.errors,
                "warnings": result.warnings,
                "config": config,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid.\n", "✓".green())
                } else {
                    let mut out = format!("{} Configuration is invalid:\n", "✗".red());
                    for error in &result.errors {
                        let _ = writeln!(out, "   - {}: {}", error.field, error.message);
                    }
                    out
                };

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                output.push_str("\nConfiguration summary:\n");
                let _ = writeln!(
                    output,
                    "   Watched root: {}",
                    config.functions.watched_root.display()
                );
                let _ = writeln!(output, "   Region: {}", config.aws.region);
                let _ = writeln!(output, "   Failure policy: {}", config.functions.failure_policy);
                let _ = writeln!(output, "   Create missing: {}", config.functions.create_missing);
                let _ = writeln!(
                    output,
                    "   Sync: {} -> {}",
                    config.sync.local_dir.display(),
                    config.sync.bucket.as_deref().unwrap_or("(no bucket)")
                );
                output
            }
        }
    }

    /// Formats a unit status with color.
    fn format_status(status: UnitStatus) -> String {
        match status {
            UnitStatus::Succeeded => "succeeded".green().to_string(),
            UnitStatus::Failed => "failed".red().to_string(),
            UnitStatus::Skipped => "skipped".dimmed().to_string(),
        }
    }
}
