//! Cluster inventory and affinity matching.
//!
//! Clusters are matched with the same selector grammar Kubernetes uses for
//! node affinity: a list of terms is OR'ed, the expressions inside a term are
//! AND'ed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A Kubernetes cluster known to the deployment system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster name, also used as the kube context.
    pub name: String,
    /// Cluster labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl PartialEq for Cluster {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Cluster {}

/// Label selector operator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Operator {
    /// Label value is one of the values.
    In,
    /// Label is absent or its value is none of the values.
    NotIn,
    /// Label is present.
    Exists,
    /// Label is absent.
    DoesNotExist,
}

/// A single label selector expression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchExpression {
    /// Label key.
    pub key: String,
    /// Operator applied to the label.
    pub operator: Operator,
    /// Values for `In` and `NotIn`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

impl MatchExpression {
    fn values(&self) -> &[String] {
        self.values.as_deref().unwrap_or_default()
    }
}

/// A group of expressions that must all match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchExpressions {
    /// The AND'ed expressions.
    #[serde(rename = "matchExpressions")]
    pub match_expressions: Vec<MatchExpression>,
}

/// `requiredDuringSchedulingIgnoredDuringExecution` selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequiredSpec {
    /// The OR'ed groups.
    #[serde(rename = "clusterSelectorTerms")]
    pub cluster_selector_terms: Vec<MatchExpressions>,
}

/// Cluster affinity of a target role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterAffinity {
    /// Required selector.
    #[serde(rename = "requiredDuringSchedulingIgnoredDuringExecution")]
    pub required: RequiredSpec,
}

impl Cluster {
    /// Creates a cluster with the given name and no labels.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Returns true if every expression matches this cluster.
    #[must_use]
    pub fn matches(&self, expressions: &[MatchExpression]) -> bool {
        expressions.iter().all(|expr| self.matches_expression(expr))
    }

    fn matches_expression(&self, expr: &MatchExpression) -> bool {
        let label = self.labels.get(&expr.key);
        match expr.operator {
            Operator::In => label.is_some_and(|v| expr.values().contains(v)),
            Operator::NotIn => label.is_none_or(|v| !expr.values().contains(v)),
            Operator::Exists => label.is_some(),
            Operator::DoesNotExist => label.is_none(),
        }
    }
}

impl RequiredSpec {
    /// Returns true if any selector term matches the cluster.
    #[must_use]
    pub fn matches(&self, cluster: &Cluster) -> bool {
        self.cluster_selector_terms
            .iter()
            .any(|term| cluster.matches(&term.match_expressions))
    }
}

/// Returns the clusters matching the affinity, in declaration order.
///
/// Without affinity every cluster is a candidate.
#[must_use]
pub fn select_clusters<'a>(
    clusters: &'a [Cluster],
    affinity: Option<&ClusterAffinity>,
) -> Vec<&'a Cluster> {
    let mut selected: Vec<&Cluster> = Vec::new();
    for cluster in clusters {
        let matched = affinity.is_none_or(|a| a.required.matches(cluster));
        if matched && !selected.iter().any(|c| c.name == cluster.name) {
            selected.push(cluster);
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(key: &str, operator: Operator, values: &[&str]) -> MatchExpression {
        MatchExpression {
            key: key.to_string(),
            operator,
            values: Some(values.iter().map(|v| (*v).to_string()).collect()),
        }
    }

    fn cluster() -> Cluster {
        Cluster::new("c1").with_label("service/status", "active")
    }

    #[test]
    fn test_operators() {
        let c = cluster();
        assert!(c.matches(&[expr("service/status", Operator::In, &["active"])]));
        assert!(!c.matches(&[expr("service/status", Operator::NotIn, &["active"])]));
        assert!(c.matches(&[expr("service/status", Operator::Exists, &[])]));
        assert!(!c.matches(&[expr("service/status", Operator::DoesNotExist, &[])]));
    }

    #[test]
    fn test_not_in_absent_label() {
        let c = cluster();
        assert!(c.matches(&[expr("zone", Operator::NotIn, &["east"])]));
        assert!(!c.matches(&[expr("zone", Operator::In, &["east"])]));
    }

    #[test]
    fn test_and_within_group() {
        let c = cluster().with_label("zone", "east");
        assert!(c.matches(&[
            expr("service/status", Operator::In, &["active"]),
            expr("zone", Operator::In, &["east"]),
        ]));
        assert!(!c.matches(&[
            expr("service/status", Operator::In, &["active"]),
            expr("zone", Operator::In, &["west"]),
        ]));
    }

    #[test]
    fn test_or_between_groups_keeps_declared_order() {
        let clusters = vec![
            Cluster::new("c1").with_label("zone", "east"),
            Cluster::new("c2").with_label("zone", "west"),
            Cluster::new("c3").with_label("zone", "north"),
        ];
        let affinity = ClusterAffinity {
            required: RequiredSpec {
                cluster_selector_terms: vec![
                    MatchExpressions {
                        match_expressions: vec![expr("zone", Operator::In, &["north"])],
                    },
                    MatchExpressions {
                        match_expressions: vec![expr("zone", Operator::In, &["east", "north"])],
                    },
                ],
            },
        };

        let names: Vec<&str> = select_clusters(&clusters, Some(&affinity))
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["c1", "c3"]);
    }

    #[test]
    fn test_parse_affinity_yaml() {
        let yaml = r"
requiredDuringSchedulingIgnoredDuringExecution:
  clusterSelectorTerms:
    - matchExpressions:
        - key: service/status
          operator: Exists
";
        let affinity: ClusterAffinity = serde_yaml::from_str(yaml).expect("valid affinity");
        assert!(affinity.required.matches(&cluster()));
        assert!(!affinity.required.matches(&Cluster::new("bare")));
    }
}
