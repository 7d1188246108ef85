//! fnship CLI entrypoint.
//!
//! This is the main entrypoint for the fnship command-line tool.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use fnship::changeset::{ChangeSet, ChangeSetResolver, working_dir};
use fnship::cli::{Cli, Commands, LogFormat, OutputFormatter, WindowArgs};
use fnship::config::{ConfigParser, ConfigValidator, FailurePolicy, FnshipConfig, find_config_file};
use fnship::error::{ConfigError, FnshipError, Result};
use fnship::lambda::{CreateSettings, LambdaDeployer};
use fnship::orchestrator::DeploymentOrchestrator;
use fnship::package::PackageBuilder;
use fnship::sync::{BucketSync, S3ObjectStore};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error ({}): {e}", e.phase());
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system. Logs go to stderr so stdout stays
/// machine-readable.
fn init_logging(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let repo = cli.repo.as_path();

    match cli.command {
        Commands::Resolve { window } => {
            let config = load_config(cli.config.as_deref(), repo)?;
            cmd_resolve(&config, repo, window).await
        }
        Commands::Plan { window } => {
            let config = load_config(cli.config.as_deref(), repo)?;
            cmd_plan(&config, repo, window, &formatter).await
        }
        Commands::Deploy {
            base,
            head,
            units,
            continue_on_error,
        } => {
            let mut config = load_config(cli.config.as_deref(), repo)?;
            if continue_on_error {
                config.functions.failure_policy = FailurePolicy::ContinueOnError;
            }
            let source = match (units, base) {
                (Some(json), _) => UnitSource::Json(json),
                (None, Some(base)) => UnitSource::Window(WindowArgs { base, head }),
                (None, None) => {
                    return Err(FnshipError::Config(ConfigError::validation(
                        "either --base or --units is required",
                        "deploy",
                    )));
                }
            };
            cmd_deploy(&config, repo, source, &formatter).await
        }
        Commands::Sync { bucket, dry_run } => {
            let mut config = load_config(cli.config.as_deref(), repo)?;
            if bucket.is_some() {
                config.sync.bucket = bucket;
            }
            cmd_sync(&config, repo, dry_run, &formatter).await
        }
        Commands::Validate { warnings } => {
            let config = load_config(cli.config.as_deref(), repo)?;
            cmd_validate(&config, warnings, &formatter)
        }
    }
}

/// Where the deploy command gets its units from.
enum UnitSource {
    /// Resolve from a commit window.
    Window(WindowArgs),
    /// Parse a JSON array printed by `resolve`.
    Json(String),
}

/// Print the change set as JSON on stdout.
async fn cmd_resolve(config: &FnshipConfig, repo: &Path, window: WindowArgs) -> Result<()> {
    let (changes, _) = resolve_changes(config, repo, window).await?;
    let json = changes.to_json()?;
    writeln!(io::stdout(), "{json}")?;
    Ok(())
}

/// Show the units a deploy would process.
async fn cmd_plan(
    config: &FnshipConfig,
    repo: &Path,
    window: WindowArgs,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (changes, workdir) = resolve_changes(config, repo, window).await?;
    let units_root = workdir.join(&config.functions.watched_root);
    emit(&formatter.format_plan(&changes, &units_root))
}

/// Build and deploy changed units.
async fn cmd_deploy(
    config: &FnshipConfig,
    repo: &Path,
    source: UnitSource,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (changes, workdir) = match source {
        UnitSource::Window(window) => resolve_changes(config, repo, window).await?,
        UnitSource::Json(json) => (ChangeSet::from_json(&json)?, repo_workdir(repo).await?),
    };
    info!("Change set: [{changes}]");

    let units_root = workdir.join(&config.functions.watched_root);
    let builder = PackageBuilder::new(workdir.join(&config.functions.artifact_dir));
    let deployer = LambdaDeployer::from_env(&config.aws.region)
        .await
        .with_create_settings(CreateSettings::from_config(&config.functions));
    debug!("Deploying to region {}", deployer.region());

    let report = DeploymentOrchestrator::new(&builder, &deployer, units_root)
        .with_policy(config.functions.failure_policy)
        .run(&changes)
        .await?;

    emit(&formatter.format_report(&report))?;

    report.failure().map_or(Ok(()), Err)
}

/// Mirror the local directory into the bucket.
async fn cmd_sync(
    config: &FnshipConfig,
    repo: &Path,
    dry_run: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let Some(bucket) = config.sync.bucket.as_deref() else {
        return Err(FnshipError::Config(ConfigError::MissingEnvVar {
            name: String::from("S3_BUCKET"),
        }));
    };

    let local_dir = repo_workdir(repo).await?.join(&config.sync.local_dir);
    let store =
        S3ObjectStore::new(bucket, &config.sync.normalized_prefix(), &config.aws.region).await;

    let report = BucketSync::new(&store)
        .with_delete_removed(config.sync.delete_removed)
        .with_dry_run(dry_run)
        .run(&local_dir)
        .await?;

    emit(&formatter.format_sync(&report))
}

/// Validate configuration.
fn cmd_validate(config: &FnshipConfig, show_warnings: bool, formatter: &OutputFormatter) -> Result<()> {
    let result = ConfigValidator::new().validate(config)?;
    emit(&formatter.format_validation(config, &result, show_warnings))?;

    if result.is_valid() {
        Ok(())
    } else {
        Err(FnshipError::Config(ConfigError::ValidationError {
            message: format!("{} error(s) found", result.errors.len()),
            field: None,
        }))
    }
}

/// Loads `.env`, the configuration file and environment overrides.
fn load_config(explicit: Option<&Path>, repo: &Path) -> Result<FnshipConfig> {
    let parser = ConfigParser::new().with_base_path(repo);
    parser.load_dotenv()?;

    let path = explicit.map(Path::to_path_buf).or_else(|| find_config_file(repo));
    if let Some(path) = &path {
        info!("Using configuration: {}", path.display());
    }

    parser.load_or_default(path.as_deref())
}

/// Finds the repository working directory off the async worker, falling
/// back to `repo` outside a checkout.
async fn repo_workdir(repo: &Path) -> Result<PathBuf> {
    let repo = repo.to_path_buf();
    tokio::task::spawn_blocking(move || working_dir(&repo))
        .await
        .map_err(|e| FnshipError::internal(format!("Repository task failed: {e}")))
}

/// Resolves the change set for a commit window.
async fn resolve_changes(
    config: &FnshipConfig,
    repo: &Path,
    window: WindowArgs,
) -> Result<(ChangeSet, PathBuf)> {
    let repo = repo.to_path_buf();
    let watched_root = config.functions.watched_root.clone();

    tokio::task::spawn_blocking(move || -> Result<(ChangeSet, PathBuf)> {
        let resolver = ChangeSetResolver::open(&repo)?;
        let changes = resolver.resolve(&window.base, &window.head, &watched_root)?;
        let workdir = resolver.workdir().map_or(repo, Path::to_path_buf);
        Ok((changes, workdir))
    })
    .await
    .map_err(|e| FnshipError::internal(format!("Resolution task failed: {e}")))?
}

/// Writes formatted output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}
