//! Target kind: how many clusters each role claims and where.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::clusters::ClusterAffinity;

/// Keyword asking a role to take every unclaimed matching cluster.
pub const REMAINING: &str = "Remaining";

/// Number of clusters requested by a role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ClustersCount {
    /// An exact number of clusters.
    Count(i64),
    /// A keyword, only `Remaining` is valid.
    Keyword(String),
}

impl Default for ClustersCount {
    fn default() -> Self {
        Self::Count(0)
    }
}

impl ClustersCount {
    /// Shorthand for the `Remaining` keyword.
    #[must_use]
    pub fn remaining() -> Self {
        Self::Keyword(REMAINING.to_string())
    }
}

impl fmt::Display for ClustersCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Keyword(k) => write!(f, "{k}"),
        }
    }
}

/// Selection of clusters for one role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetSpec {
    /// Optional affinity narrowing the candidate clusters.
    #[serde(rename = "clusterAffinity", default, skip_serializing_if = "Option::is_none")]
    pub cluster_affinity: Option<ClusterAffinity>,
    /// How many clusters to take.
    #[serde(rename = "clustersCount", alias = "clusterCount", default)]
    pub clusters_count: ClustersCount,
}

/// Roles of a target kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetKindSpec {
    /// Active role.
    #[serde(default)]
    pub active: TargetSpec,
    /// Standby role.
    #[serde(default)]
    pub standby: TargetSpec,
    /// Services-only role.
    #[serde(
        rename = "services-only",
        alias = "service-only",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub services_only: Option<TargetSpec>,
    /// Whether a local load balancer fronts the clusters.
    #[serde(rename = "localLoadBalancer", default)]
    pub local_load_balancer: bool,
}

/// Target kind document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetKind {
    /// API version.
    #[serde(rename = "apiVersion", default = "super::default_api_version")]
    pub api_version: String,
    /// Kind name.
    #[serde(default = "default_target_kind")]
    pub kind: String,
    /// Roles.
    pub spec: TargetKindSpec,
}

fn default_target_kind() -> String {
    "Target".to_string()
}

/// Cluster topology a plan resolves to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TargetClass {
    /// A single active cluster.
    OneCluster,
    /// Several active clusters.
    MultiCluster,
    /// Active clusters backed by standby clusters.
    ActiveStandby,
}

impl fmt::Display for TargetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OneCluster => "one-cluster",
            Self::MultiCluster => "multi-cluster",
            Self::ActiveStandby => "active-standby",
        };
        write!(f, "{s}")
    }
}

/// Role a chart is installed for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// Installed on a one-cluster plan.
    OneCluster,
    /// Installed on a multi-cluster plan.
    MultiCluster,
    /// Installed on the active side of an active-standby plan.
    Active,
    /// Installed on the standby side of an active-standby plan.
    Standby,
}

impl Target {
    /// Name used in value-file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneCluster => "one-cluster",
            Self::MultiCluster => "multi-cluster",
            Self::Active => "active",
            Self::Standby => "standby",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target classes a chart declares it supports.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetClasses {
    /// Supports one-cluster plans.
    #[serde(rename = "one-cluster", default)]
    pub one_cluster: bool,
    /// Supports multi-cluster plans.
    #[serde(rename = "multi-cluster", default)]
    pub multi_cluster: bool,
    /// Supports active-standby plans.
    #[serde(rename = "active-standby", default)]
    pub active_standby: bool,
}

/// Clusters assigned to each role and the resulting class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetPlan {
    /// Resolved class.
    #[serde(rename = "target-class")]
    pub target_class: TargetClass,
    /// Active clusters.
    pub active: Vec<String>,
    /// Standby clusters.
    pub standby: Vec<String>,
    /// Services-only clusters.
    #[serde(rename = "services-only")]
    pub services_only: Vec<String>,
}

impl TargetPlan {
    /// Creates a plan with no clusters assigned.
    #[must_use]
    pub const fn empty(target_class: TargetClass) -> Self {
        Self {
            target_class,
            active: Vec::new(),
            standby: Vec::new(),
            services_only: Vec::new(),
        }
    }

    /// Total number of clusters involved.
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.active.len() + self.standby.len() + self.services_only.len()
    }
}

impl fmt::Display for TargetPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Target class: {}", self.target_class)?;
        writeln!(f, "  active: [{}]", self.active.join(", "))?;
        writeln!(f, "  standby: [{}]", self.standby.join(", "))?;
        write!(f, "  services-only: [{}]", self.services_only.join(", "))
    }
}
