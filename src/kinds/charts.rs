//! Chart descriptor (`noops.yaml`) embedded in every chart.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{PackageError, Result};

use super::profiles::ProfileClasses;
use super::targets::TargetClasses;

/// File name of the descriptor at the chart root.
pub const CHART_DESCRIPTOR: &str = "noops.yaml";

/// Helm settings of a chart.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HelmSpec {
    /// Scripts run before the upgrade, relative to the pre-processing path.
    #[serde(rename = "pre-processing", default)]
    pub pre_processing: Vec<String>,
}

/// Profile and target classes a chart supports.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupportedSpec {
    /// Supported profiles.
    #[serde(rename = "profile-classes", default)]
    pub profile_classes: ProfileClasses,
    /// Supported targets.
    #[serde(rename = "target-classes", default)]
    pub target_classes: TargetClasses,
}

/// Package section of the descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartPackageSpec {
    /// Helm settings.
    #[serde(default)]
    pub helm: HelmSpec,
    /// Declared support, nothing is supported when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported: Option<SupportedSpec>,
}

/// Descriptor specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartSpec {
    /// Package section.
    #[serde(default)]
    pub package: ChartPackageSpec,
}

/// Chart kind document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartKind {
    /// API version.
    #[serde(rename = "apiVersion", default = "super::default_api_version")]
    pub api_version: String,
    /// Kind name.
    #[serde(default)]
    pub kind: String,
    /// Specification.
    #[serde(default)]
    pub spec: ChartSpec,
}

impl ChartKind {
    /// Reads the descriptor of the chart at `chart_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is missing or invalid.
    pub async fn load(chart_dir: &Path) -> Result<Self> {
        let path = chart_dir.join(CHART_DESCRIPTOR);
        if !tokio::fs::try_exists(&path).await? {
            return Err(PackageError::FileNotFound { path }.into());
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let chart: Self = serde_yaml::from_str(&content).map_err(|e| {
            PackageError::InvalidChartDescriptor {
                path: path.clone(),
                message: e.to_string(),
            }
        })?;

        debug!(
            "Loaded chart descriptor {} ({} pre-processing scripts)",
            path.display(),
            chart.pre_processing().len()
        );
        Ok(chart)
    }

    /// Pre-processing scripts, in order.
    #[must_use]
    pub fn pre_processing(&self) -> &[String] {
        &self.spec.package.helm.pre_processing
    }

    /// Declared support, empty when the chart declares nothing.
    #[must_use]
    pub fn supported(&self) -> SupportedSpec {
        self.spec.package.supported.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_descriptor() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(
            dir.path().join(CHART_DESCRIPTOR),
            r"
apiVersion: noops.local/v1alpha1
kind: Chart
spec:
  package:
    helm:
      pre-processing:
        - bin/prepare.sh
    supported:
      profile-classes:
        canary: true
      target-classes:
        one-cluster: true
",
        )
        .expect("Failed to write descriptor");

        let chart = ChartKind::load(dir.path()).await.expect("valid descriptor");
        assert_eq!(chart.pre_processing(), ["bin/prepare.sh".to_string()]);
        assert!(chart.supported().profile_classes.canary);
        assert!(chart.supported().target_classes.one_cluster);
        assert!(!chart.supported().target_classes.multi_cluster);
    }

    #[tokio::test]
    async fn test_missing_descriptor() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let err = ChartKind::load(dir.path()).await.expect_err("missing descriptor");
        assert!(err.to_string().contains(CHART_DESCRIPTOR));
    }
}
