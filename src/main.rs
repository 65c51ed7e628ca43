//! NoOps CLI entrypoint.
//!
//! This is the main entrypoint for the noops command-line tool.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use noops_deploy::cli::{
    Cli, Commands, OutputFormat, OutputFormatter, ProjectsCommands, TargetsCommands,
    VersionsCommands,
};
use noops_deploy::config::{KindParser, KindValidator, Settings, ValidationResult};
use noops_deploy::error::{ConfigError, Result};
use noops_deploy::kinds::{ProjectKind, ProjectPlanKind, TargetKind, VersionKind};
use noops_deploy::package::HelmInstall;
use noops_deploy::planner::{ProjectPlanner, ReconciliationPlan, TargetPlanner};
use noops_deploy::reconciler::Reconciler;

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    init_logging(cli.verbose, cli.log_format == OutputFormat::Json);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over `--verbose`. Logs go to stderr so that
/// documents written to stdout stay parseable.
fn init_logging(verbose: bool, json: bool) {
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
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point. Returns false when the command ran but failed.
async fn run(cli: Cli) -> Result<bool> {
    let formatter = OutputFormatter::new(cli.output);

    let mut settings = Settings::load(None)?.with_dry_run(cli.dry_run);
    if let Some(workdir) = cli.workdir {
        settings = settings.with_workdir(workdir);
    }
    debug!("Settings: {settings:?}");

    match cli.command {
        Commands::Targets { command } => match command {
            TargetsCommands::Plan { clusters, target } => {
                cmd_targets_plan(&clusters, &target, &formatter)
            }
        },
        Commands::Versions { command } => match command {
            VersionsCommands::Verify { versions } => cmd_versions_verify(&versions, &formatter),
        },
        Commands::Projects { command } => match command {
            ProjectsCommands::Create {
                namespace,
                release,
                chart,
                env,
                args,
                envs,
                out,
            } => {
                let envs = parse_envs(&envs)?;
                let project =
                    ProjectPlanner::new().create(&namespace, &release, &chart, &env, args, envs);
                emit(&project, out.as_deref(), &formatter)
            }
            ProjectsCommands::Plan {
                clusters,
                target,
                versions,
                project,
                out,
            } => cmd_projects_plan(&clusters, &target, &versions, &project, out.as_deref(), &formatter),
            ProjectsCommands::ReconcilePlan { project, previous } => {
                cmd_reconcile_plan(&project, previous.as_deref(), &formatter)
            }
            ProjectsCommands::Apply {
                plan,
                previous,
                preprocessing,
            } => {
                let reconciler = reconciler(&settings, preprocessing, None);
                cmd_apply(&reconciler, &plan, previous.as_deref(), &formatter).await
            }
            ProjectsCommands::ClusterApply {
                project,
                previous,
                preprocessing,
                kube_context,
            } => {
                let reconciler = reconciler(&settings, preprocessing, kube_context);
                cmd_cluster_apply(&reconciler, &project, previous.as_deref(), &formatter).await
            }
            ProjectsCommands::ClusterDelete {
                project,
                kube_context,
            } => {
                let reconciler = reconciler(&settings, None, kube_context);
                cmd_cluster_delete(&reconciler, &project, &formatter).await
            }
        },
    }
}

/// Builds a reconciler from the settings.
fn reconciler(
    settings: &Settings,
    preprocessing: Option<PathBuf>,
    kube_context: Option<String>,
) -> Reconciler {
    let helm = HelmInstall::with_processes(settings.workdir.clone())
        .with_helm(&settings.helm)
        .with_hook(&settings.hook)
        .with_dry_run(settings.dry_run)
        .with_kube_context(kube_context);

    Reconciler::new(helm)
        .with_canary_template(settings.canary_template)
        .with_preprocessing(preprocessing.or_else(|| settings.preprocessing.clone()))
}

/// Plan the clusters of a target.
fn cmd_targets_plan(clusters: &Path, target: &Path, formatter: &OutputFormatter) -> Result<bool> {
    let parser = KindParser::new();
    let validator = KindValidator::new();

    let clusters = parser.load_clusters(clusters)?;
    log_warnings(&validator.validate_clusters(&clusters)?);
    let target: TargetKind = parser.load_file(target)?;
    log_warnings(&validator.validate_target(&target)?);

    let plan = TargetPlanner::new(clusters).plan(&target)?;
    print(&formatter.format_target_plan(&plan, target.spec.local_load_balancer));
    Ok(true)
}

/// Check a version document.
fn cmd_versions_verify(versions: &Path, formatter: &OutputFormatter) -> Result<bool> {
    let parser = KindParser::new();
    let document: VersionKind = parser.load_file(versions)?;

    let result = KindValidator::new().validate_versions(&document)?;
    document.verify(true)?;

    print(&formatter.format_validation(&versions.display().to_string(), &result));
    Ok(true)
}

/// Build a project plan.
fn cmd_projects_plan(
    clusters: &Path,
    target: &Path,
    versions: &Path,
    project: &Path,
    out: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let parser = KindParser::new();
    let validator = KindValidator::new();

    let clusters = parser.load_clusters(clusters)?;
    log_warnings(&validator.validate_clusters(&clusters)?);
    let target: TargetKind = parser.load_file(target)?;
    log_warnings(&validator.validate_target(&target)?);
    let versions: VersionKind = parser.load_file(versions)?;
    log_warnings(&validator.validate_versions(&versions)?);
    let project: ProjectKind = parser.load_file(project)?;
    log_warnings(&validator.validate_project(&project)?);

    let plan = ProjectPlanner::new().plan(clusters, &target, &versions, &project)?;

    if out.is_some() {
        eprintln!("{}", formatter.format_project_plan(&plan));
    }
    emit(&plan, out, formatter)
}

/// Show the operations between two projects.
fn cmd_reconcile_plan(
    project: &Path,
    previous: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let parser = KindParser::new();
    let current: ProjectKind = parser.load_file(project)?;
    current.spec.versions.verify(true)?;

    let previous = match previous {
        Some(path) => parser.load_file(path)?,
        None => ProjectPlanner::new().skeleton_from(&current),
    };

    let plan = ReconciliationPlan::compute(&current.spec, &previous.spec);
    print(&formatter.format_reconciliation(&plan));
    Ok(true)
}

/// Apply a project plan.
async fn cmd_apply(
    reconciler: &Reconciler,
    plan: &Path,
    previous: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let parser = KindParser::new();
    let plan: ProjectPlanKind = parser.load_file(plan)?;
    let previous: Option<ProjectPlanKind> = previous.map(|p| parser.load_file(p)).transpose()?;

    let report = reconciler.apply_plan(&plan, previous.as_ref()).await;
    print(&formatter.format_apply_report(&report));

    if !report.success() {
        error!("{} of {} clusters failed", report.failed(), report.outcomes.len());
    }
    Ok(report.success())
}

/// Apply a project to one cluster.
async fn cmd_cluster_apply(
    reconciler: &Reconciler,
    project: &Path,
    previous: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let parser = KindParser::new();
    let project: ProjectKind = parser.load_file(project)?;
    log_warnings(&KindValidator::new().validate_project(&project)?);
    let previous: Option<ProjectKind> = previous.map(|p| parser.load_file(p)).transpose()?;

    let plan = reconciler.apply_incluster(&project, previous.as_ref()).await?;
    print(&formatter.format_reconciliation(&plan));
    info!("Applied {} ({} operations)", project.name(), plan.operation_count());
    Ok(true)
}

/// Remove a project from one cluster.
async fn cmd_cluster_delete(
    reconciler: &Reconciler,
    project: &Path,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let project: ProjectKind = KindParser::new().load_file(project)?;

    let plan = reconciler.delete_incluster(&project).await?;
    print(&formatter.success(&format!(
        "Deleted {} ({} releases)",
        project.name(),
        plan.operation_count()
    )));
    Ok(true)
}

/// Writes `document` to `out`, or to stdout.
fn emit<T: serde::Serialize>(
    document: &T,
    out: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<bool> {
    match out {
        Some(path) => {
            KindParser::new().write_file(path, document)?;
            eprintln!("{}", formatter.success(&format!("Written {}", path.display())));
        }
        None => print(&formatter.format_document(document)),
    }
    Ok(true)
}

/// Parses `KEY=VALUE` pairs.
fn parse_envs(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(ConfigError::ValidationError {
                message: format!("'{pair}' is not KEY=VALUE"),
                field: Some("--set-env".to_string()),
            }
            .into()),
        })
        .collect()
}

fn log_warnings(result: &ValidationResult) {
    for warning in &result.warnings {
        warn!("{warning}");
    }
}

fn print(output: &str) {
    let _ = writeln!(std::io::stdout().lock(), "{}", output.trim_end());
}
