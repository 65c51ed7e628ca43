//! Typed documents exchanged with the deployment system.
//!
//! Every document shares the `noops.local/v1alpha1` API version and is read
//! from YAML or JSON.

mod charts;
mod clusters;
mod profiles;
mod projects;
mod targets;
mod versions;

pub use charts::{CHART_DESCRIPTOR, ChartKind, ChartPackageSpec, ChartSpec, HelmSpec, SupportedSpec};
pub use clusters::{
    Cluster, ClusterAffinity, MatchExpression, MatchExpressions, Operator, RequiredSpec,
    select_clusters,
};
pub use profiles::{Profile, ProfileClasses};
pub use projects::{
    InstallSpec, Metadata, PackageSpec, ProjectKind, ProjectPlanEntry, ProjectPlanKind,
    ProjectPlanSpec, ProjectSpec, ProjectTemplate, WhiteLabelSpec,
};
pub use targets::{
    ClustersCount, REMAINING, Target, TargetClass, TargetClasses, TargetKind, TargetKindSpec,
    TargetPlan, TargetSpec,
};
pub use versions::{MultiSpec, OneSpec, Version, VersionKind, VersionsSpec};

/// API version of every kind.
pub const API_VERSION: &str = "noops.local/v1alpha1";

fn default_api_version() -> String {
    API_VERSION.to_string()
}
