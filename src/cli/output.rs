//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{KindParser, SpecHasher, ValidationResult};
use crate::kinds::{ProjectPlanKind, TargetPlan};
use crate::planner::ReconciliationPlan;
use crate::reconciler::PlanApplyReport;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Target role row for table display.
#[derive(Tabled)]
struct RoleRow {
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Clusters")]
    clusters: String,
}

/// Project plan entry row for table display.
#[derive(Tabled)]
struct PlanEntryRow {
    #[tabled(rename = "Clusters")]
    clusters: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Services only")]
    services_only: String,
    #[tabled(rename = "Spec")]
    hash: String,
}

/// Release operation row for table display.
#[derive(Tabled)]
struct OperationRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Version")]
    version: String,
}

/// Cluster outcome row for table display.
#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Operations")]
    operations: usize,
    #[tabled(rename = "Result")]
    result: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a document: YAML as text, JSON otherwise.
    #[must_use]
    pub fn format_document<T: Serialize>(&self, document: &T) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(document).unwrap_or_default(),
            OutputFormat::Text => KindParser::new().to_yaml(document).unwrap_or_default(),
        }
    }

    /// Formats a target plan, with the load balancer flag of its target.
    #[must_use]
    pub fn format_target_plan(&self, plan: &TargetPlan, local_load_balancer: bool) -> String {
        if self.format == OutputFormat::Json {
            let mut json = serde_json::to_value(plan).unwrap_or_default();
            if let Some(map) = json.as_object_mut() {
                map.insert(
                    "localLoadBalancer".to_string(),
                    serde_json::Value::Bool(local_load_balancer),
                );
            }
            return serde_json::to_string_pretty(&json).unwrap_or_default();
        }

        let mut output = String::new();
        let _ = writeln!(output, "\nTarget plan: {}\n", plan.target_class.to_string().bold());

        let rows = [
            ("active", &plan.active),
            ("standby", &plan.standby),
            ("services-only", &plan.services_only),
        ]
        .into_iter()
        .map(|(role, clusters)| RoleRow {
            role: role.to_string(),
            clusters: if clusters.is_empty() {
                "-".dimmed().to_string()
            } else {
                clusters.join(", ")
            },
        });
        output.push_str(&Table::new(rows).to_string());
        let _ = writeln!(
            output,
            "\nLocal load balancer: {}",
            if local_load_balancer { "yes" } else { "no" }
        );
        output
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, what: &str, result: &ValidationResult) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "status": "valid",
                    "document": what,
                    "warnings": result.warnings,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = format!("{} {what} is valid\n", "✓".green());
                for warning in &result.warnings {
                    let _ = writeln!(output, "   {} {warning}", "⚠".yellow());
                }
                output
            }
        }
    }

    /// Formats a project plan.
    #[must_use]
    pub fn format_project_plan(&self, plan: &ProjectPlanKind) -> String {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(plan).unwrap_or_default();
        }

        let hasher = SpecHasher::new();
        let mut output = String::new();
        let _ = writeln!(
            output,
            "\nProject plan: {}/{} ({}, {})\n",
            plan.metadata.namespace,
            plan.metadata.name.bold(),
            plan.spec.target_class,
            hasher.short_hash(&hasher.hash_plan(plan))
        );

        let rows: Vec<PlanEntryRow> = plan
            .spec
            .plan
            .iter()
            .map(|entry| {
                let install = &entry.template.spec.package.install;
                PlanEntryRow {
                    clusters: entry.clusters.join(", "),
                    target: install
                        .target
                        .map_or_else(|| "-".to_string(), |t| t.to_string()),
                    services_only: if install.services_only { "yes" } else { "no" }.to_string(),
                    hash: hasher.short_hash(&hasher.hash_project(&entry.template.spec)),
                }
            })
            .collect();

        if rows.is_empty() {
            output.push_str("   No cluster selected.\n");
        } else {
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }
        output
    }

    /// Formats a reconciliation plan.
    #[must_use]
    pub fn format_reconciliation(&self, plan: &ReconciliationPlan) -> String {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(plan).unwrap_or_default();
        }

        if plan.is_empty() {
            return format!("{} No changes required, releases are up to date.\n", "✓".green());
        }

        let mut rows = Vec::new();
        let mut push = |action: String, version: String| {
            rows.push(OperationRow {
                index: rows.len() + 1,
                action,
                version,
            });
        };

        for version in &plan.removed {
            push("-uninstall".red().to_string(), version.to_string());
        }
        if plan.removed_canary {
            push("-uninstall".red().to_string(), "canary aggregate".to_string());
        }
        for version in &plan.changed {
            push("~upgrade".yellow().to_string(), version.to_string());
        }
        for version in &plan.added {
            push("+install".green().to_string(), version.to_string());
        }
        if let Some(canary) = &plan.canary_versions {
            let apps: Vec<&str> = canary.iter().map(|v| v.app_version.as_str()).collect();
            push(
                "~upgrade".yellow().to_string(),
                format!("canary aggregate ({})", apps.join(", ")),
            );
        }

        let mut output = String::from("\nReconciliation plan\n\n");
        output.push_str(&Table::new(rows).to_string());
        let _ = write!(
            output,
            "\n\nPlan: {} to install, {} to upgrade, {} to uninstall\n",
            plan.added.len().to_string().green(),
            (plan.changed.len() + usize::from(plan.canary_versions.is_some()))
                .to_string()
                .yellow(),
            (plan.removed.len() + usize::from(plan.removed_canary))
                .to_string()
                .red()
        );
        output
    }

    /// Formats the report of a plan application.
    #[must_use]
    pub fn format_apply_report(&self, report: &PlanApplyReport) -> String {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(report).unwrap_or_default();
        }

        let status = if report.success() {
            format!("{} Apply successful", "✓".green())
        } else {
            format!("{} Apply failed on {} clusters", "✗".red(), report.failed())
        };

        let rows = report.outcomes.iter().map(|o| OutcomeRow {
            cluster: o.cluster.clone(),
            action: o.action.to_string(),
            operations: o.operations,
            result: o.error.as_ref().map_or_else(
                || "ok".green().to_string(),
                |e| Self::truncate(e, 60).red().to_string(),
            ),
        });

        let mut output = format!("{status} (run {})\n\n", report.run_id);
        output.push_str(&Table::new(rows).to_string());
        let _ = writeln!(
            output,
            "\n\nStarted {}, took {}s",
            report.started_at.format("%Y-%m-%d %H:%M:%S"),
            (report.finished_at - report.started_at).num_seconds()
        );
        output
    }

    /// Formats a success message.
    #[must_use]
    pub fn success(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": "success", "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{} {message}", "✓".green()),
        }
    }

    /// Truncates a string to a maximum length.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{head}...")
        }
    }
}
