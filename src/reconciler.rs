//! Reconciler applying projects to clusters.
//!
//! This module turns a [`ReconciliationPlan`] into helm operations for one
//! cluster, and fans a project plan out over every cluster it names.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use crate::config::{CanaryTemplate, SpecHasher};
use crate::error::Result;
use crate::kinds::{MultiSpec, Profile, ProjectKind, ProjectPlanKind, Version};
use crate::package::archive::is_local_archive;
use crate::package::release::{
    canary_instances_args, canary_weight_args, chart_keyword, release_name, white_label_args,
};
use crate::package::{HelmInstall, UpgradeRequest};
use crate::planner::{ProjectPlanner, ReconciliationPlan};

/// Reconciler for one cluster, or a whole plan.
#[derive(Debug, Clone)]
pub struct Reconciler {
    /// Helm executor.
    helm: HelmInstall,
    /// Canary aggregate template.
    canary_template: CanaryTemplate,
    /// Pre-processing scripts directory.
    preprocessing: Option<PathBuf>,
    /// Spec hasher.
    hasher: SpecHasher,
}

/// What was done to a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterAction {
    /// The project was applied.
    Apply,
    /// The project was removed.
    Delete,
}

impl fmt::Display for ClusterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apply => write!(f, "apply"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Outcome of one cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterOutcome {
    /// Cluster name.
    pub cluster: String,
    /// Action taken.
    pub action: ClusterAction,
    /// Operations planned.
    pub operations: usize,
    /// Error message (if failed).
    pub error: Option<String>,
    /// When the cluster was started.
    pub started_at: DateTime<Utc>,
    /// When the cluster was done.
    pub finished_at: DateTime<Utc>,
}

impl ClusterOutcome {
    /// Returns true if the cluster was reconciled.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Report of a plan application.
#[derive(Debug, Clone, Serialize)]
pub struct PlanApplyReport {
    /// Identifier of the run, also recorded in the logs.
    pub run_id: Uuid,
    /// Project name.
    pub project: String,
    /// Per-cluster outcomes, in processing order.
    pub outcomes: Vec<ClusterOutcome>,
    /// Start of the run.
    pub started_at: DateTime<Utc>,
    /// End of the run.
    pub finished_at: DateTime<Utc>,
}

impl PlanApplyReport {
    /// Returns true if every cluster succeeded.
    #[must_use]
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(ClusterOutcome::success)
    }

    /// Number of failed clusters.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success()).count()
    }
}

impl Reconciler {
    /// Creates a reconciler driving `helm`.
    #[must_use]
    pub fn new(helm: HelmInstall) -> Self {
        Self {
            helm,
            canary_template: CanaryTemplate::default(),
            preprocessing: None,
            hasher: SpecHasher::new(),
        }
    }

    /// Sets the canary aggregate template.
    #[must_use]
    pub const fn with_canary_template(mut self, template: CanaryTemplate) -> Self {
        self.canary_template = template;
        self
    }

    /// Sets the pre-processing scripts directory.
    #[must_use]
    pub fn with_preprocessing(mut self, preprocessing: Option<PathBuf>) -> Self {
        self.preprocessing = preprocessing;
        self
    }

    /// The helm executor.
    #[must_use]
    pub const fn helm(&self) -> &HelmInstall {
        &self.helm
    }

    /// A reconciler for `cluster`, sharing the repository lock.
    #[must_use]
    pub fn for_cluster(&self, cluster: &str) -> Self {
        Self {
            helm: self.helm.clone().with_kube_context(Some(cluster.to_string())),
            ..self.clone()
        }
    }

    /// Moves the cluster from `previous` to `current`.
    ///
    /// Uninstalls come first, then upgrades, then the canary aggregate.
    ///
    /// # Errors
    ///
    /// Stops at the first failed operation.
    pub async fn reconciliation(
        &self,
        current: &ProjectKind,
        previous: &ProjectKind,
    ) -> Result<ReconciliationPlan> {
        let plan = ReconciliationPlan::compute(&current.spec, &previous.spec);
        info!("Reconciling {}: {plan}", current.name());

        for version in &plan.removed {
            self.helm
                .uninstall(previous.namespace(), &release_name(previous.name(), version))
                .await?;
        }
        if plan.removed_canary {
            self.helm
                .uninstall(previous.namespace(), previous.name())
                .await?;
        }

        for version in plan.changed.iter().chain(&plan.added) {
            self.reconciliation_upgrade(
                current,
                &release_name(current.name(), version),
                version,
                None,
                canary_weight_args(version.weight()),
            )
            .await?;
        }

        if let Some(canary) = &plan.canary_versions
            && let Some(template) = self.canary_template_of(canary)
        {
            debug!(
                "Canary aggregate of {} built from {}",
                current.name(),
                template.app_version
            );
            self.reconciliation_upgrade(
                current,
                current.name(),
                &Version::Multi(template.clone()),
                Some(vec![Profile::Default, Profile::CanaryEndpointsOnly]),
                canary_instances_args(canary),
            )
            .await?;
        }

        Ok(plan)
    }

    fn canary_template_of<'a>(&self, canary: &'a [MultiSpec]) -> Option<&'a MultiSpec> {
        match self.canary_template {
            CanaryTemplate::First => canary.first(),
            CanaryTemplate::Last => canary.last(),
        }
    }

    /// Installs or upgrades one release of `project`.
    ///
    /// `profiles` replaces the version profiles when set; `cargs` lead the
    /// trailing arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the upgrade fails.
    pub async fn reconciliation_upgrade(
        &self,
        project: &ProjectKind,
        release: &str,
        version: &Version,
        profiles: Option<Vec<Profile>>,
        cargs: Vec<String>,
    ) -> Result<()> {
        let install = project.install();

        let chart = if is_local_archive(&install.chart) {
            install.chart.clone()
        } else {
            chart_keyword(&install.chart, version)
        };

        let mut profiles = profiles.unwrap_or_else(|| version.profiles());
        if install.services_only {
            profiles.push(Profile::ServicesOnly);
        }

        let mut extra_args = cargs;
        extra_args.extend(install.args.iter().flatten().cloned());
        extra_args.extend(version.args().iter().cloned());
        extra_args.extend(white_label_args(install.white_label.as_ref()));

        let request = UpgradeRequest {
            namespace: project.namespace().to_string(),
            release: release.to_string(),
            chart,
            env: install.env.clone(),
            preprocessing: self.preprocessing.clone(),
            profiles,
            extra_args,
            extra_envs: install.envs.clone().unwrap_or_default(),
            target: install.target,
        };
        self.helm.upgrade(&request).await
    }

    /// Applies `project` to the cluster, against `previous` when known.
    ///
    /// # Errors
    ///
    /// Returns an error if the versions are invalid or an operation fails.
    pub async fn apply_incluster(
        &self,
        project: &ProjectKind,
        previous: Option<&ProjectKind>,
    ) -> Result<ReconciliationPlan> {
        project.spec.versions.verify(true)?;

        let hash = self.hasher.hash_project(&project.spec);
        info!(
            "Applying {} ({}) to {}",
            project.name(),
            self.hasher.short_hash(&hash),
            self.helm.kube_context().unwrap_or("current context")
        );

        match previous {
            Some(previous) => self.reconciliation(project, previous).await,
            None => {
                let skeleton = ProjectPlanner::new().skeleton_from(project);
                self.reconciliation(project, &skeleton).await
            }
        }
    }

    /// Removes every release of `project` from the cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if an uninstall fails.
    pub async fn delete_incluster(&self, project: &ProjectKind) -> Result<ReconciliationPlan> {
        info!(
            "Deleting {} from {}",
            project.name(),
            self.helm.kube_context().unwrap_or("current context")
        );
        let skeleton = ProjectPlanner::new().skeleton_from(project);
        self.reconciliation(&skeleton, project).await
    }

    /// Applies `plan` cluster by cluster.
    ///
    /// Clusters only present in `previous_plan` are cleaned up. A failure is
    /// recorded and the next cluster is processed.
    pub async fn apply_plan(
        &self,
        plan: &ProjectPlanKind,
        previous_plan: Option<&ProjectPlanKind>,
    ) -> PlanApplyReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("apply_plan", %run_id, project = %plan.metadata.name);

        async {
            let started_at = Utc::now();
            let mut outcomes = Vec::new();

            for cluster in plan.clusters() {
                let Some(project) = plan.project_for(cluster) else {
                    continue;
                };
                let previous = previous_plan.and_then(|p| p.project_for(cluster));
                let reconciler = self.for_cluster(cluster);

                let cluster_start = Utc::now();
                let result = reconciler
                    .apply_incluster(&project, previous.as_ref())
                    .await;
                outcomes.push(outcome(cluster, ClusterAction::Apply, cluster_start, result));
            }

            if let Some(previous_plan) = previous_plan {
                let current = plan.clusters();
                for cluster in previous_plan.clusters() {
                    if current.contains(&cluster) {
                        continue;
                    }
                    let Some(project) = previous_plan.project_for(cluster) else {
                        continue;
                    };
                    let reconciler = self.for_cluster(cluster);

                    let cluster_start = Utc::now();
                    let result = reconciler.delete_incluster(&project).await;
                    outcomes.push(outcome(cluster, ClusterAction::Delete, cluster_start, result));
                }
            }

            let report = PlanApplyReport {
                run_id,
                project: plan.metadata.name.clone(),
                outcomes,
                started_at,
                finished_at: Utc::now(),
            };
            info!(
                "Plan applied to {} clusters, {} failed",
                report.outcomes.len(),
                report.failed()
            );
            report
        }
        .instrument(span)
        .await
    }
}

fn outcome(
    cluster: &str,
    action: ClusterAction,
    started_at: DateTime<Utc>,
    result: Result<ReconciliationPlan>,
) -> ClusterOutcome {
    let (operations, error) = match result {
        Ok(plan) => (plan.operation_count(), None),
        Err(e) => {
            error!("Failed to {action} on {cluster}: {e}");
            (0, Some(e.to_string()))
        }
    };
    ClusterOutcome {
        cluster: cluster.to_string(),
        action,
        operations,
        error,
        started_at,
        finished_at: Utc::now(),
    }
}

impl fmt::Display for PlanApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success() { "successful" } else { "failed" };
        writeln!(f, "Apply of {} {status} (run {}):", self.project, self.run_id)?;
        for outcome in &self.outcomes {
            match &outcome.error {
                None => writeln!(
                    f,
                    "  {} {}: {} operations",
                    outcome.action, outcome.cluster, outcome.operations
                )?,
                Some(error) => writeln!(
                    f,
                    "  {} {}: FAILED - {error}",
                    outcome.action, outcome.cluster
                )?,
            }
        }
        Ok(())
    }
}
