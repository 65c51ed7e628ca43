//! Target planner.
//!
//! Assigns disjoint sets of clusters to the active, standby and services-only
//! roles of a target kind, then classifies the result.

use tracing::debug;

use crate::error::{ConfigError, NoopsError, Result, TargetError};
use crate::kinds::{
    Cluster, ClustersCount, REMAINING, Target, TargetClass, TargetClasses, TargetKind, TargetPlan,
    TargetSpec, select_clusters,
};

/// Computes target plans over a fixed cluster inventory.
#[derive(Debug, Clone, Default)]
pub struct TargetPlanner {
    /// Known clusters, in declaration order.
    clusters: Vec<Cluster>,
}

impl TargetPlanner {
    /// Creates a planner over the given clusters.
    #[must_use]
    pub const fn new(clusters: Vec<Cluster>) -> Self {
        Self { clusters }
    }

    /// Assigns clusters to every role and derives the target class.
    ///
    /// Roles are evaluated in the order active, standby, services-only; a
    /// cluster claimed by a role is never offered to a later one.
    ///
    /// # Errors
    ///
    /// Returns an error if a role asks for more clusters than are available,
    /// if a `clustersCount` is invalid, or if the roles do not resolve to a
    /// target class.
    pub fn plan(&self, kind: &TargetKind) -> Result<TargetPlan> {
        let mut claimed: Vec<String> = Vec::new();

        let active = self.claim(&kind.spec.active, &mut claimed)?;
        let standby = self.claim(&kind.spec.standby, &mut claimed)?;
        let services_only = match &kind.spec.services_only {
            Some(spec) => self.claim(spec, &mut claimed)?,
            None => Vec::new(),
        };

        let target_class = classify(active.len(), standby.len())?;
        debug!(
            "Target plan {target_class}: active={active:?} standby={standby:?} services-only={services_only:?}"
        );

        Ok(TargetPlan {
            target_class,
            active,
            standby,
            services_only,
        })
    }

    /// Claims clusters for one role.
    fn claim(&self, spec: &TargetSpec, claimed: &mut Vec<String>) -> Result<Vec<String>> {
        if let ClustersCount::Count(n) = spec.clusters_count
            && n < 1
        {
            return Ok(Vec::new());
        }

        let pool: Vec<&Cluster> = select_clusters(&self.clusters, spec.cluster_affinity.as_ref())
            .into_iter()
            .filter(|c| !claimed.contains(&c.name))
            .collect();

        let taken: Vec<String> = match &spec.clusters_count {
            ClustersCount::Count(n) => {
                let requested = usize::try_from(*n).map_err(|_| {
                    NoopsError::Config(ConfigError::InvalidClustersCount {
                        value: n.to_string(),
                    })
                })?;
                if requested > pool.len() {
                    return Err(TargetError::ClustersAvailability {
                        available: pool.len(),
                        requested,
                    }
                    .into());
                }
                pool.iter().take(requested).map(|c| c.name.clone()).collect()
            }
            ClustersCount::Keyword(keyword) if keyword == REMAINING => {
                pool.iter().map(|c| c.name.clone()).collect()
            }
            ClustersCount::Keyword(keyword) => {
                return Err(ConfigError::InvalidClustersCount {
                    value: keyword.clone(),
                }
                .into());
            }
        };

        claimed.extend(taken.iter().cloned());
        Ok(taken)
    }

    /// Returns true if the chart supports being installed for `target`.
    #[must_use]
    pub const fn is_compatible(target: Target, supported: &TargetClasses) -> bool {
        match target {
            Target::OneCluster => supported.one_cluster,
            Target::MultiCluster => supported.multi_cluster,
            Target::Active | Target::Standby => supported.active_standby,
        }
    }

    /// Checks that `target` is supported and consistent with the plan class.
    ///
    /// # Errors
    ///
    /// Returns `TargetNotSupported` otherwise.
    pub fn verify(plan: &TargetPlan, target: Target, supported: &TargetClasses) -> Result<()> {
        if !Self::is_compatible(target, supported) {
            return Err(TargetError::TargetNotSupported {
                target: target.to_string(),
                expected: Vec::new(),
            }
            .into());
        }

        let expected: &[Target] = match plan.target_class {
            TargetClass::OneCluster => &[Target::OneCluster],
            TargetClass::MultiCluster => &[Target::MultiCluster],
            TargetClass::ActiveStandby => &[Target::Active, Target::Standby],
        };

        if expected.contains(&target) {
            Ok(())
        } else {
            Err(TargetError::TargetNotSupported {
                target: target.to_string(),
                expected: expected.iter().map(ToString::to_string).collect(),
            }
            .into())
        }
    }
}

/// Derives the target class from the role sizes.
fn classify(active: usize, standby: usize) -> Result<TargetClass> {
    match (active, standby) {
        (1, 0) => Ok(TargetClass::OneCluster),
        (a, 0) if a > 1 => Ok(TargetClass::MultiCluster),
        (a, s) if a >= 1 && s > 0 => Ok(TargetClass::ActiveStandby),
        _ => Err(TargetError::PlanTargetUnknown.into()),
    }
}
