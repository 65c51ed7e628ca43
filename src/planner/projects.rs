//! Project planning: combines a target plan, a version kind and a project
//! template into a project plan.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::Result;
use crate::kinds::{
    Cluster, InstallSpec, Metadata, PackageSpec, ProjectKind, ProjectPlanEntry, ProjectPlanKind,
    ProjectPlanSpec, ProjectSpec, ProjectTemplate, Target, TargetClass, TargetKind, VersionKind,
    VersionsSpec,
};

use super::targets::TargetPlanner;

/// Role of a cluster group inside a project plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Active,
    Standby,
    ServicesOnly,
}

/// Builds project documents and project plans.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectPlanner;

impl ProjectPlanner {
    /// Creates a project planner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Builds the project plan for `project` over `clusters`.
    ///
    /// Every non-empty role of the target plan becomes one plan entry with a
    /// copy of the project spec carrying the given versions.
    ///
    /// # Errors
    ///
    /// Returns an error if the target plan cannot be computed or the
    /// versions are invalid.
    pub fn plan(
        &self,
        clusters: Vec<Cluster>,
        target: &TargetKind,
        versions: &VersionKind,
        project: &ProjectKind,
    ) -> Result<ProjectPlanKind> {
        let target_plan = TargetPlanner::new(clusters).plan(target)?;
        versions.verify(true)?;

        info!(
            "Planning project {} as {} over {} clusters",
            project.name(),
            target_plan.target_class,
            target_plan.cluster_count()
        );

        let groups = [
            (Scope::Active, &target_plan.active),
            (Scope::Standby, &target_plan.standby),
            (Scope::ServicesOnly, &target_plan.services_only),
        ];

        let plan = groups
            .into_iter()
            .filter(|(_, names)| !names.is_empty())
            .map(|(scope, names)| {
                let mut spec = project.spec.clone();
                spec.versions = versions.spec.clone();
                spec.package.install.target = install_target(target_plan.target_class, scope);
                spec.package.install.services_only = scope == Scope::ServicesOnly;
                debug!("Plan entry {scope:?}: {names:?}");
                ProjectPlanEntry {
                    clusters: names.clone(),
                    template: ProjectTemplate { spec },
                }
            })
            .collect();

        Ok(ProjectPlanKind::new(
            project.metadata.clone(),
            ProjectPlanSpec {
                target_class: target_plan.target_class,
                plan,
            },
        ))
    }

    /// Creates a project with no versions.
    #[must_use]
    pub fn create(
        &self,
        namespace: &str,
        release: &str,
        chart: &str,
        env: &str,
        args: Vec<String>,
        envs: BTreeMap<String, String>,
    ) -> ProjectKind {
        ProjectKind::new(
            Metadata {
                name: release.to_string(),
                namespace: namespace.to_string(),
            },
            ProjectSpec {
                package: PackageSpec {
                    install: InstallSpec {
                        chart: chart.to_string(),
                        env: env.to_string(),
                        target: None,
                        services_only: false,
                        args: (!args.is_empty()).then_some(args),
                        envs: (!envs.is_empty()).then_some(envs),
                        white_label: None,
                    },
                },
                versions: VersionsSpec::default(),
            },
        )
    }

    /// Copies `project` with every version removed.
    ///
    /// Reconciling against the skeleton installs or uninstalls every release.
    #[must_use]
    pub fn skeleton_from(&self, project: &ProjectKind) -> ProjectKind {
        let mut skeleton = project.clone();
        skeleton.spec.versions = VersionsSpec::default();
        skeleton
    }
}

const fn install_target(class: TargetClass, scope: Scope) -> Option<Target> {
    match (class, scope) {
        (TargetClass::OneCluster, _) => Some(Target::OneCluster),
        (TargetClass::MultiCluster, _) => Some(Target::MultiCluster),
        (TargetClass::ActiveStandby, Scope::Active) => Some(Target::Active),
        (TargetClass::ActiveStandby, Scope::Standby) => Some(Target::Standby),
        (TargetClass::ActiveStandby, Scope::ServicesOnly) => None,
    }
}
