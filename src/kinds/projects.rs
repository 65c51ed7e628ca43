//! Project and project plan kinds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::targets::{Target, TargetClass};
use super::versions::VersionsSpec;

/// Name and namespace of a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    /// Project name, also the base release name.
    pub name: String,
    /// Kubernetes namespace.
    pub namespace: String,
}

/// Rebranding values forwarded to the chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WhiteLabelSpec {
    /// Brand name.
    pub rebrand: String,
    /// Marketer name.
    pub marketer: String,
}

/// How the project chart is installed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallSpec {
    /// Chart name in the repository, or a local `.tgz` archive.
    pub chart: String,
    /// Environment (selects `values-<env>.yaml` and the kustomize overlay).
    pub env: String,
    /// Target role the chart is installed for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    /// Install backing services only.
    #[serde(rename = "services-only", default)]
    pub services_only: bool,
    /// Extra package manager arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// Extra environment variables for pre-processing scripts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envs: Option<BTreeMap<String, String>>,
    /// Rebranding.
    #[serde(rename = "white-label", default, skip_serializing_if = "Option::is_none")]
    pub white_label: Option<WhiteLabelSpec>,
}

/// Package section of a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageSpec {
    /// Install settings.
    pub install: InstallSpec,
}

/// Project specification, also used as a plan template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectSpec {
    /// Package settings shared by every version.
    pub package: PackageSpec,
    /// Deployed versions.
    #[serde(default)]
    pub versions: VersionsSpec,
}

/// Project kind document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectKind {
    /// API version.
    #[serde(rename = "apiVersion", default = "super::default_api_version")]
    pub api_version: String,
    /// Kind name.
    #[serde(default = "default_project_kind")]
    pub kind: String,
    /// Name and namespace.
    pub metadata: Metadata,
    /// Specification.
    pub spec: ProjectSpec,
}

fn default_project_kind() -> String {
    "Project".to_string()
}

impl ProjectKind {
    /// Creates a project document.
    #[must_use]
    pub fn new(metadata: Metadata, spec: ProjectSpec) -> Self {
        Self {
            api_version: super::default_api_version(),
            kind: default_project_kind(),
            metadata,
            spec,
        }
    }

    /// Project name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Project namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// Install settings.
    #[must_use]
    pub const fn install(&self) -> &InstallSpec {
        &self.spec.package.install
    }
}

/// Template applied to a group of clusters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectTemplate {
    /// Project spec for the group.
    pub spec: ProjectSpec,
}

/// Clusters sharing the same project template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectPlanEntry {
    /// Cluster names.
    #[serde(default)]
    pub clusters: Vec<String>,
    /// Template to apply.
    pub template: ProjectTemplate,
}

/// Project plan specification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectPlanSpec {
    /// Class of the target plan the project plan was built from.
    #[serde(rename = "target-class")]
    pub target_class: TargetClass,
    /// Cluster groups.
    #[serde(default)]
    pub plan: Vec<ProjectPlanEntry>,
}

/// Project plan kind document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectPlanKind {
    /// API version.
    #[serde(rename = "apiVersion", default = "super::default_api_version")]
    pub api_version: String,
    /// Kind name.
    #[serde(default = "default_project_plan_kind")]
    pub kind: String,
    /// Name and namespace of the planned project.
    pub metadata: Metadata,
    /// Specification.
    pub spec: ProjectPlanSpec,
}

fn default_project_plan_kind() -> String {
    "ProjectPlan".to_string()
}

impl ProjectPlanKind {
    /// Creates a plan document.
    #[must_use]
    pub fn new(metadata: Metadata, spec: ProjectPlanSpec) -> Self {
        Self {
            api_version: super::default_api_version(),
            kind: default_project_plan_kind(),
            metadata,
            spec,
        }
    }

    /// Returns the project the plan asks for on `cluster`, if any.
    #[must_use]
    pub fn project_for(&self, cluster: &str) -> Option<ProjectKind> {
        self.spec
            .plan
            .iter()
            .find(|entry| entry.clusters.iter().any(|c| c == cluster))
            .map(|entry| ProjectKind::new(self.metadata.clone(), entry.template.spec.clone()))
    }

    /// All clusters of the plan, in plan order.
    #[must_use]
    pub fn clusters(&self) -> Vec<&str> {
        self.spec
            .plan
            .iter()
            .flat_map(|entry| entry.clusters.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r"
apiVersion: noops.local/v1alpha1
kind: Project
metadata:
  name: demo
  namespace: shop
spec:
  package:
    install:
      chart: noops/demo
      env: dev
      services-only: false
      args: ['--wait']
      envs:
        HELLO: world
      white-label:
        rebrand: acme
        marketer: sales
  versions:
    one:
      app_version: 1.0.0
";

    #[test]
    fn test_parse_project() {
        let project: ProjectKind = serde_yaml::from_str(PROJECT).expect("valid project");
        assert_eq!(project.name(), "demo");
        assert_eq!(project.namespace(), "shop");
        let install = project.install();
        assert_eq!(install.args.as_deref(), Some(&["--wait".to_string()][..]));
        assert_eq!(
            install.white_label.as_ref().map(|w| w.rebrand.as_str()),
            Some("acme")
        );
        assert!(install.target.is_none());
    }

    #[test]
    fn test_project_for_cluster() {
        let project: ProjectKind = serde_yaml::from_str(PROJECT).expect("valid project");
        let plan = ProjectPlanKind::new(
            project.metadata.clone(),
            ProjectPlanSpec {
                target_class: TargetClass::MultiCluster,
                plan: vec![ProjectPlanEntry {
                    clusters: vec!["c1".to_string(), "c2".to_string()],
                    template: ProjectTemplate {
                        spec: project.spec.clone(),
                    },
                }],
            },
        );

        assert_eq!(plan.clusters(), vec!["c1", "c2"]);
        assert_eq!(plan.project_for("c2"), Some(project));
        assert!(plan.project_for("c9").is_none());
    }
}
