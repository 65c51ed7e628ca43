//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// NoOps - Multi-cluster target planner and helm reconciliation engine.
#[derive(Parser, Debug)]
#[command(name = "noops")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log mutating commands instead of running them.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: OutputFormat,

    /// Work directory for generated files.
    #[arg(long, global = true)]
    pub workdir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cluster targeting.
    Targets {
        /// Targets subcommand.
        #[command(subcommand)]
        command: TargetsCommands,
    },

    /// Version documents.
    Versions {
        /// Versions subcommand.
        #[command(subcommand)]
        command: VersionsCommands,
    },

    /// Projects and project plans.
    Projects {
        /// Projects subcommand.
        #[command(subcommand)]
        command: ProjectsCommands,
    },
}

/// Target subcommands.
#[derive(Subcommand, Debug)]
pub enum TargetsCommands {
    /// Assign clusters to the active, standby and services-only roles.
    Plan {
        /// Cluster list.
        #[arg(long)]
        clusters: PathBuf,

        /// Target document.
        #[arg(long)]
        target: PathBuf,
    },
}

/// Version subcommands.
#[derive(Subcommand, Debug)]
pub enum VersionsCommands {
    /// Check a version document.
    Verify {
        /// Version document.
        #[arg(long)]
        versions: PathBuf,
    },
}

/// Project subcommands.
#[derive(Subcommand, Debug)]
pub enum ProjectsCommands {
    /// Create a project document with no version.
    Create {
        /// Kubernetes namespace.
        #[arg(long)]
        namespace: String,

        /// Project (release) name.
        #[arg(long)]
        release: String,

        /// Chart search keyword or local archive.
        #[arg(long)]
        chart: String,

        /// Environment.
        #[arg(long)]
        env: String,

        /// Extra helm argument (repeatable).
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,

        /// Pre-processing environment variable as KEY=VALUE (repeatable).
        #[arg(long = "set-env")]
        envs: Vec<String>,

        /// Write the document to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Build a project plan over the clusters.
    Plan {
        /// Cluster list.
        #[arg(long)]
        clusters: PathBuf,

        /// Target document.
        #[arg(long)]
        target: PathBuf,

        /// Version document.
        #[arg(long)]
        versions: PathBuf,

        /// Project document.
        #[arg(long)]
        project: PathBuf,

        /// Write the plan to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show the operations moving a cluster from one project to another.
    ReconcilePlan {
        /// Project to apply.
        #[arg(long)]
        project: PathBuf,

        /// Project currently applied.
        #[arg(long)]
        previous: Option<PathBuf>,
    },

    /// Apply a project plan to every cluster it names.
    Apply {
        /// Project plan.
        #[arg(long)]
        plan: PathBuf,

        /// Plan currently applied.
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Pre-processing scripts directory.
        #[arg(long)]
        preprocessing: Option<PathBuf>,
    },

    /// Apply a project to one cluster.
    ClusterApply {
        /// Project to apply.
        #[arg(long)]
        project: PathBuf,

        /// Project currently applied.
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Pre-processing scripts directory.
        #[arg(long)]
        preprocessing: Option<PathBuf>,

        /// Kube context, the current one when unset.
        #[arg(long)]
        kube_context: Option<String>,
    },

    /// Remove a project from one cluster.
    ClusterDelete {
        /// Project to remove.
        #[arg(long)]
        project: PathBuf,

        /// Kube context, the current one when unset.
        #[arg(long)]
        kube_context: Option<String>,
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
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_project_plan() {
        let cli = Cli::try_parse_from([
            "noops",
            "--dry-run",
            "projects",
            "plan",
            "--clusters",
            "clusters.yaml",
            "--target",
            "target.yaml",
            "--versions",
            "versions.yaml",
            "--project",
            "project.yaml",
        ])
        .expect("valid command line");

        assert!(cli.dry_run);
        assert!(matches!(
            cli.command,
            Commands::Projects {
                command: ProjectsCommands::Plan { .. }
            }
        ));
    }

    #[test]
    fn test_parse_create_with_hyphen_args() {
        let cli = Cli::try_parse_from([
            "noops",
            "projects",
            "create",
            "--namespace",
            "ns",
            "--release",
            "demo",
            "--chart",
            "noops/demo",
            "--env",
            "dev",
            "--arg",
            "--wait",
            "--set-env",
            "TOKEN=t",
        ])
        .expect("valid command line");

        let Commands::Projects {
            command: ProjectsCommands::Create { args, envs, .. },
        } = cli.command
        else {
            panic!("expected projects create");
        };
        assert_eq!(args, vec!["--wait"]);
        assert_eq!(envs, vec!["TOKEN=t"]);
    }
}
