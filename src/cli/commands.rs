//! CLI command definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// fnship - Selective deployment of changed serverless functions.
#[derive(Parser, Debug)]
#[command(name = "fnship")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "FNSHIP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path inside the git repository.
    #[arg(long, global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Commit range to diff.
#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Commit before the push. Unresolvable or all-zero values diff from the root commit.
    #[arg(long, env = "FNSHIP_BASE_REF")]
    pub base: String,

    /// Commit after the push.
    #[arg(long, default_value = "HEAD")]
    pub head: String,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the changed units as a JSON array.
    Resolve {
        /// Commit range.
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Show the units a deploy would process.
    Plan {
        /// Commit range.
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Build and deploy changed units.
    Deploy {
        /// Commit before the push.
        #[arg(long, conflicts_with = "units", required_unless_present = "units")]
        base: Option<String>,

        /// Commit after the push.
        #[arg(long, default_value = "HEAD")]
        head: String,

        /// Change set as a JSON array, as printed by `resolve`.
        #[arg(long)]
        units: Option<String>,

        /// Attempt every unit even after a failure.
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Mirror the local sync directory into the bucket.
    Sync {
        /// Bucket name (overrides configuration).
        #[arg(long, env = "S3_BUCKET")]
        bucket: Option<String>,

        /// Print the plan without changing the bucket.
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration.
    Validate {
        /// Show warnings as well as errors.
        #[arg(short, long)]
        warnings: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_deploy_from_units() {
        let cli = Cli::try_parse_from(["fnship", "deploy", "--units", r#"["alpha"]"#]).unwrap();
        match cli.command {
            Commands::Deploy {
                base,
                units,
                continue_on_error,
                ..
            } => {
                assert!(base.is_none());
                assert_eq!(units.as_deref(), Some(r#"["alpha"]"#));
                assert!(!continue_on_error);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_deploy_rejects_base_with_units() {
        let result = Cli::try_parse_from([
            "fnship", "deploy", "--base", "abc", "--units", "[]",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_deploy_needs_base_or_units() {
        assert!(Cli::try_parse_from(["fnship", "deploy"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fnship",
            "plan",
            "--base",
            "HEAD~1",
            "--output",
            "json",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Plan { window } => {
                assert_eq!(window.base, "HEAD~1");
                assert_eq!(window.head, "HEAD");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
