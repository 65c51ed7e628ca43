//! Reconciliation plan.
//!
//! Diffs the versions of a previous project against the current one. The
//! canary aggregate release is tracked apart from the per-version releases:
//! it only depends on whether weighted versions exist and whether the weighted
//! set changed.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

use crate::kinds::{MultiSpec, ProjectSpec, Version};

/// Operations needed to move from a previous project to the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    /// Versions to install.
    pub added: Vec<Version>,
    /// Versions to upgrade.
    pub changed: Vec<Version>,
    /// Versions to uninstall.
    pub removed: Vec<Version>,
    /// Weighted versions served by the canary aggregate, if it must be upgraded.
    pub canary_versions: Option<Vec<MultiSpec>>,
    /// Whether the canary aggregate must be uninstalled.
    pub removed_canary: bool,
}

impl ReconciliationPlan {
    /// Computes the plan from `previous` to `current`.
    #[must_use]
    pub fn compute(current: &ProjectSpec, previous: &ProjectSpec) -> Self {
        let forced_change = current.package != previous.package;
        let mut plan = Self::default();

        plan.diff_one(current, previous, forced_change);
        plan.diff_multi(
            current.versions.multi.as_deref(),
            previous.versions.multi.as_deref(),
            forced_change,
        );
        plan.track_canary(
            current.versions.multi.as_deref(),
            previous.versions.multi.as_deref(),
            forced_change,
        );

        plan
    }

    fn diff_one(&mut self, current: &ProjectSpec, previous: &ProjectSpec, forced_change: bool) {
        match (&current.versions.one, &previous.versions.one) {
            (None, None) => {}
            (None, Some(prev)) => self.removed.push(Version::One(prev.clone())),
            (Some(cur), None) => self.added.push(Version::One(cur.clone())),
            (Some(cur), Some(prev)) => {
                if cur != prev || forced_change {
                    self.changed.push(Version::One(cur.clone()));
                }
            }
        }
    }

    fn diff_multi(
        &mut self,
        current: Option<&[MultiSpec]>,
        previous: Option<&[MultiSpec]>,
        forced_change: bool,
    ) {
        let current = keyed(current.unwrap_or_default());
        let previous = keyed(previous.unwrap_or_default());

        self.removed.extend(
            previous
                .iter()
                .filter(|(app, _)| !current.contains_key(*app))
                .map(|(_, v)| Version::Multi((*v).clone())),
        );

        for (app, cur) in &current {
            match previous.get(app) {
                None => self.added.push(Version::Multi((*cur).clone())),
                Some(prev) if forced_change || prev != cur => {
                    self.changed.push(Version::Multi((*cur).clone()));
                }
                Some(_) => {}
            }
        }
    }

    fn track_canary(
        &mut self,
        current: Option<&[MultiSpec]>,
        previous: Option<&[MultiSpec]>,
        forced_change: bool,
    ) {
        let current = canary_subset(current);
        let previous = canary_subset(previous);

        match (previous.is_empty(), current.is_empty()) {
            (false, false) => {
                if forced_change || previous != current {
                    self.canary_versions = Some(current);
                }
            }
            (false, true) => self.removed_canary = true,
            (true, false) => self.canary_versions = Some(current),
            (true, true) => {}
        }
    }

    /// Returns true if nothing has to be done.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.changed.is_empty()
            && self.removed.is_empty()
            && self.canary_versions.is_none()
            && !self.removed_canary
    }

    /// Number of release operations the plan issues.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.added.len()
            + self.changed.len()
            + self.removed.len()
            + usize::from(self.canary_versions.as_ref().is_some_and(|c| !c.is_empty()))
            + usize::from(self.removed_canary)
    }
}

/// Indexes versions by `app_version`, keeping their order.
fn keyed(versions: &[MultiSpec]) -> IndexMap<&str, &MultiSpec> {
    versions
        .iter()
        .map(|v| (v.app_version.as_str(), v))
        .collect()
}

fn canary_subset(versions: Option<&[MultiSpec]>) -> Vec<MultiSpec> {
    versions
        .unwrap_or_default()
        .iter()
        .filter(|v| v.is_canary())
        .cloned()
        .collect()
}

impl fmt::Display for ReconciliationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No changes required");
        }

        for version in &self.removed {
            writeln!(f, "  - {version}")?;
        }
        if self.removed_canary {
            writeln!(f, "  - canary aggregate")?;
        }
        for version in &self.changed {
            writeln!(f, "  ~ {version}")?;
        }
        for version in &self.added {
            writeln!(f, "  + {version}")?;
        }
        if let Some(canary) = &self.canary_versions {
            let apps: Vec<&str> = canary.iter().map(|v| v.app_version.as_str()).collect();
            writeln!(f, "  ~ canary aggregate [{}]", apps.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::kinds::{InstallSpec, OneSpec, PackageSpec, VersionsSpec};
    use std::collections::BTreeMap;

    pub(crate) fn install() -> InstallSpec {
        InstallSpec {
            chart: "noops/demo".to_string(),
            env: "dev".to_string(),
            target: None,
            services_only: false,
            args: None,
            envs: None,
            white_label: None,
        }
    }

    pub(crate) fn spec(one: Option<&str>, multi: Option<&[(&str, Option<u32>)]>) -> ProjectSpec {
        ProjectSpec {
            package: PackageSpec { install: install() },
            versions: VersionsSpec {
                one: one.map(OneSpec::new),
                multi: multi.map(|versions| {
                    versions
                        .iter()
                        .map(|(app, weight)| MultiSpec {
                            weight: *weight,
                            ..MultiSpec::new(*app)
                        })
                        .collect()
                }),
            },
        }
    }

    fn apps(versions: &[Version]) -> Vec<&str> {
        versions.iter().map(Version::app_version).collect()
    }

    fn full() -> ProjectSpec {
        spec(Some("1.0.0"), Some(&[("2.0.0", None), ("3.0.0", None)]))
    }

    #[test]
    fn test_identical_is_empty() {
        let plan = ReconciliationPlan::compute(&full(), &full());
        assert!(plan.is_empty());
        assert!(plan.canary_versions.is_none());
        assert!(!plan.removed_canary);

        let canary = spec(None, Some(&[("2.0.0", Some(40)), ("3.0.0", Some(60))]));
        assert!(ReconciliationPlan::compute(&canary, &canary).is_empty());
    }

    #[test]
    fn test_forced_change_on_envs() {
        let previous = full();
        let mut current = full();
        current.package.install.envs = Some(BTreeMap::from([(
            "HELLO".to_string(),
            "world".to_string(),
        )]));

        let plan = ReconciliationPlan::compute(&current, &previous);
        assert_eq!(apps(&plan.changed), vec!["1.0.0", "2.0.0", "3.0.0"]);
        assert!(plan.added.is_empty());
        assert!(plan.removed.is_empty());
    }

    #[test]
    fn test_remove_all() {
        let plan = ReconciliationPlan::compute(&spec(None, None), &full());
        assert_eq!(apps(&plan.removed), vec!["1.0.0", "2.0.0", "3.0.0"]);
        assert!(matches!(plan.removed[0], Version::One(_)));
        assert!(plan.added.is_empty());
        assert!(!plan.removed_canary);
    }

    #[test]
    fn test_add_all() {
        let plan = ReconciliationPlan::compute(&full(), &spec(None, None));
        assert_eq!(apps(&plan.added), vec!["1.0.0", "2.0.0", "3.0.0"]);
        assert!(plan.changed.is_empty());
        assert!(plan.canary_versions.is_none());
    }

    #[test]
    fn test_rename_multi_version() {
        let previous = spec(None, Some(&[("2.0.0", None), ("3.0.0", None)]));
        let current = spec(None, Some(&[("2.0.0", None), ("4.0.0", None)]));

        let plan = ReconciliationPlan::compute(&current, &previous);
        assert_eq!(apps(&plan.removed), vec!["3.0.0"]);
        assert_eq!(apps(&plan.added), vec!["4.0.0"]);
        assert!(plan.changed.is_empty());
    }

    #[test]
    fn test_order_follows_each_side() {
        let previous = spec(None, Some(&[("c", None), ("a", None), ("b", None)]));
        let current = spec(None, Some(&[("z", None), ("b", None), ("y", None)]));

        let plan = ReconciliationPlan::compute(&current, &previous);
        assert_eq!(apps(&plan.removed), vec!["c", "a"]);
        assert_eq!(apps(&plan.added), vec!["z", "y"]);
    }

    #[test]
    fn test_canary_weight_change() {
        let previous = spec(None, Some(&[("2.0.0", Some(40)), ("3.0.0", Some(60))]));
        let current = spec(None, Some(&[("2.0.0", Some(10)), ("3.0.0", Some(90))]));

        let plan = ReconciliationPlan::compute(&current, &previous);
        assert_eq!(apps(&plan.changed), vec!["2.0.0", "3.0.0"]);
        let canary = plan.canary_versions.expect("canary aggregate must be upgraded");
        assert_eq!(canary.len(), 2);
        assert_eq!(canary[0].weight, Some(10));
        assert_eq!(canary[1].weight, Some(90));
        assert!(!plan.removed_canary);
    }

    #[test]
    fn test_canary_removed() {
        let previous = spec(None, Some(&[("2.0.0", Some(40)), ("3.0.0", Some(60))]));
        let current = spec(None, None);

        let plan = ReconciliationPlan::compute(&current, &previous);
        assert_eq!(apps(&plan.removed), vec!["2.0.0", "3.0.0"]);
        assert!(plan.removed_canary);
        assert!(plan.canary_versions.is_none());
    }

    #[test]
    fn test_canary_started() {
        let previous = spec(None, Some(&[("2.0.0", None)]));
        let current = spec(None, Some(&[("2.0.0", Some(50)), ("3.0.0", Some(50))]));

        let plan = ReconciliationPlan::compute(&current, &previous);
        assert_eq!(apps(&plan.changed), vec!["2.0.0"]);
        assert_eq!(apps(&plan.added), vec!["3.0.0"]);
        assert_eq!(plan.canary_versions.as_ref().map(Vec::len), Some(2));
        assert_eq!(plan.operation_count(), 3);
    }
}
