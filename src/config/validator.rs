//! Validation of kind documents before planning.
//!
//! Collects every problem found in a document instead of stopping at the
//! first one, so the CLI can report them together.

use std::collections::HashSet;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::kinds::{
    Cluster, ClustersCount, ProjectKind, REMAINING, TargetKind, TargetSpec, VersionKind,
    VersionsSpec,
};
use crate::package::archive::is_local_archive;

/// Validator for kind documents.
#[derive(Debug, Default)]
pub struct KindValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl KindValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates the cluster inventory.
    ///
    /// # Errors
    ///
    /// Returns the first error if validation fails.
    pub fn validate_clusters(&self, clusters: &[Cluster]) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();
        let mut seen = HashSet::new();

        for (i, cluster) in clusters.iter().enumerate() {
            let field = format!("clusters[{i}].name");
            if cluster.name.is_empty() {
                result.error(field, "Cluster name cannot be empty");
            } else if !seen.insert(cluster.name.as_str()) {
                result.error(field, format!("Duplicate cluster name '{}'", cluster.name));
            }
            if cluster.labels.is_empty() {
                result
                    .warnings
                    .push(format!("Cluster '{}' has no labels", cluster.name));
            }
        }

        result.into_result()
    }

    /// Validates a project document.
    ///
    /// # Errors
    ///
    /// Returns the first error if validation fails.
    pub fn validate_project(&self, project: &ProjectKind) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        if !is_valid_name(project.name()) {
            result.error(
                "metadata.name",
                format!(
                    "Project name '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                    project.name()
                ),
            );
        }
        if !is_valid_name(project.namespace()) {
            result.error(
                "metadata.namespace",
                format!(
                    "Namespace '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                    project.namespace()
                ),
            );
        }

        let install = project.install();
        if install.chart.is_empty() {
            result.error("spec.package.install.chart", "Chart cannot be empty");
        } else if is_local_archive(&install.chart)
            && !std::path::Path::new(&install.chart).exists()
        {
            result
                .warnings
                .push(format!("Local chart archive {} does not exist yet", install.chart));
        }
        if install.env.is_empty() {
            result.error("spec.package.install.env", "Environment cannot be empty");
        }

        Self::check_versions(&project.spec.versions, "spec.versions", &mut result);

        result.into_result()
    }

    /// Validates a version document.
    ///
    /// # Errors
    ///
    /// Returns the first error if validation fails.
    pub fn validate_versions(&self, versions: &VersionKind) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();
        Self::check_versions(&versions.spec, "spec", &mut result);
        if versions.spec.is_empty() {
            result.warnings.push(String::from("No version declared"));
        }
        result.into_result()
    }

    /// Validates a target document.
    ///
    /// # Errors
    ///
    /// Returns the first error if validation fails.
    pub fn validate_target(&self, target: &TargetKind) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::check_target_spec(&target.spec.active, "spec.active", &mut result);
        Self::check_target_spec(&target.spec.standby, "spec.standby", &mut result);
        if let Some(services_only) = &target.spec.services_only {
            Self::check_target_spec(services_only, "spec.services-only", &mut result);
        }

        result.into_result()
    }

    fn check_target_spec(spec: &TargetSpec, field: &str, result: &mut ValidationResult) {
        match &spec.clusters_count {
            ClustersCount::Count(n) if *n < 0 => {
                result.error(
                    format!("{field}.clustersCount"),
                    format!("Cluster count {n} cannot be negative"),
                );
            }
            ClustersCount::Keyword(k) if k != REMAINING => {
                result.error(
                    format!("{field}.clustersCount"),
                    ConfigError::InvalidClustersCount { value: k.clone() }.to_string(),
                );
            }
            _ => {}
        }
        if spec.cluster_affinity.is_none() {
            result
                .warnings
                .push(format!("{field} has no cluster affinity, every cluster matches"));
        }
    }

    fn check_versions(versions: &VersionsSpec, field: &str, result: &mut ValidationResult) {
        let mut seen = HashSet::new();
        for (i, multi) in versions.multi.iter().flatten().enumerate() {
            if let Some(weight) = multi.weight
                && weight > 100
            {
                result.error(
                    format!("{field}.multi[{i}].weight"),
                    format!("Weight {weight} is out of range (0-100)"),
                );
            }
            if !seen.insert(multi.app_version.as_str()) {
                result.error(
                    format!("{field}.multi[{i}].app_version"),
                    format!("Duplicate app_version '{}'", multi.app_version),
                );
            }
        }

        if let Err(e) = versions.verify(true) {
            result.error(field, e.to_string());
        }
    }
}

/// Validates that a name is a DNS label: lowercase alphanumeric with
/// hyphens, starting with a letter, not ending with a hyphen.
fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 63 {
        return false;
    }

    let mut chars = name.chars();
    if let Some(first) = chars.next()
        && !first.is_ascii_lowercase()
    {
        return false;
    }

    if chars.any(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-') {
        return false;
    }

    !name.ends_with('-')
}

impl ValidationResult {
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    fn into_result(self) -> Result<Self> {
        if let Some(first_error) = self.errors.first() {
            return Err(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }
            .into());
        }
        debug!("Validation passed with {} warnings", self.warnings.len());
        Ok(self)
    }

    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::{Metadata, MultiSpec};
    use crate::planner::reconcile::tests::spec;
    use crate::planner::targets::tests::{clusters, targets};

    #[test]
    fn test_valid_name() {
        assert!(is_valid_name("demo"));
        assert!(is_valid_name("my-app-123"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("Demo"));
        assert!(!is_valid_name("1demo"));
        assert!(!is_valid_name("demo_app"));
        assert!(!is_valid_name("demo-"));
    }

    #[test]
    fn test_duplicate_clusters() {
        let validator = KindValidator::new();
        assert!(validator.validate_clusters(&clusters()).is_ok());

        let mut duplicated = clusters();
        duplicated.push(Cluster::new("c1"));
        let err = validator
            .validate_clusters(&duplicated)
            .expect_err("c1 is declared twice");
        assert!(err.to_string().contains("c1"));
    }

    #[test]
    fn test_project_names() {
        let validator = KindValidator::new();
        let project = ProjectKind::new(
            Metadata {
                name: "demo".to_string(),
                namespace: "demo-ns".to_string(),
            },
            spec(Some("1.0.0"), None),
        );
        assert!(validator.validate_project(&project).is_ok());

        let mut invalid = project;
        invalid.metadata.namespace = "Demo_NS".to_string();
        assert!(validator.validate_project(&invalid).is_err());
    }

    #[test]
    fn test_weight_range() {
        let validator = KindValidator::new();
        let versions = VersionKind::new(VersionsSpec {
            one: None,
            multi: Some(vec![
                MultiSpec::new("1.0.0").with_weight(150),
                MultiSpec::new("2.0.0"),
            ]),
        });
        let err = validator
            .validate_versions(&versions)
            .expect_err("weight 150 is out of range");
        assert!(err.to_string().contains("150"));
    }

    #[test]
    fn test_target_document() {
        let validator = KindValidator::new();
        let result = validator.validate_target(&targets()).expect("valid target");
        assert!(result.is_valid());
    }
}
