//! Version kind: one version, or several weighted (canary) versions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{NoopsError, Result};

use super::profiles::Profile;

/// A single deployed version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OneSpec {
    /// Application version, primary key of the release.
    pub app_version: String,
    /// Chart version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Build identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    /// Extra package manager arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

/// One of several versions deployed side by side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MultiSpec {
    /// Application version, primary key of the release.
    pub app_version: String,
    /// Chart version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Build identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    /// Canary weight, 0 to 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    /// Whether this version gets its own endpoints.
    #[serde(
        rename = "dedicated-endpoints",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dedicated_endpoints: Option<bool>,
    /// Extra package manager arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

impl OneSpec {
    /// Creates a version with only the application version set.
    #[must_use]
    pub fn new(app_version: impl Into<String>) -> Self {
        Self {
            app_version: app_version.into(),
            version: None,
            build: None,
            args: None,
        }
    }
}

impl MultiSpec {
    /// Creates a version with only the application version set.
    #[must_use]
    pub fn new(app_version: impl Into<String>) -> Self {
        Self {
            app_version: app_version.into(),
            version: None,
            build: None,
            weight: None,
            dedicated_endpoints: None,
            args: None,
        }
    }

    /// Sets the canary weight.
    #[must_use]
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Returns true if this version takes part in a canary.
    #[must_use]
    pub const fn is_canary(&self) -> bool {
        self.weight.is_some()
    }
}

/// Versions of a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionsSpec {
    /// The single version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one: Option<OneSpec>,
    /// The side-by-side versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi: Option<Vec<MultiSpec>>,
}

impl VersionsSpec {
    /// Returns true if no version is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.one.is_none() && self.multi.as_ref().is_none_or(Vec::is_empty)
    }

    /// Weighted versions, in declaration order.
    #[must_use]
    pub fn canary_versions(&self) -> Vec<&MultiSpec> {
        self.multi
            .iter()
            .flatten()
            .filter(|m| m.is_canary())
            .collect()
    }

    /// Checks the version invariants.
    ///
    /// With `check` set a violation is returned as an error, otherwise as
    /// `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns `VerifyFailure` when `check` is set and an invariant is violated.
    pub fn verify(&self, check: bool) -> Result<bool> {
        match self.violation() {
            None => Ok(true),
            Some(message) if check => Err(NoopsError::verify_failure(message)),
            Some(_) => Ok(false),
        }
    }

    fn violation(&self) -> Option<String> {
        let mut app_versions: HashSet<&str> = HashSet::new();
        if let Some(one) = &self.one {
            app_versions.insert(one.app_version.as_str());
        }

        let mut use_canary = false;
        let mut weight_sum: u32 = 0;
        for version in self.multi.iter().flatten() {
            if let Some(weight) = version.weight {
                if weight > 100 {
                    return Some(format!(
                        "weight {weight} of app_version '{}' is out of range 0..=100",
                        version.app_version
                    ));
                }
                use_canary = true;
                weight_sum += weight;
            }
            if !app_versions.insert(version.app_version.as_str()) {
                return Some(format!("app_version '{}' is duplicated", version.app_version));
            }
        }

        if self.one.is_some() && use_canary {
            return Some("one and canary can not be used together".to_string());
        }

        if use_canary && weight_sum != 100 {
            return Some(format!("sum(weight) is {weight_sum}, expected 100"));
        }

        None
    }
}

/// Version kind document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionKind {
    /// API version.
    #[serde(rename = "apiVersion", default = "super::default_api_version")]
    pub api_version: String,
    /// Kind name.
    #[serde(default = "default_version_kind")]
    pub kind: String,
    /// Versions.
    pub spec: VersionsSpec,
}

fn default_version_kind() -> String {
    "Version".to_string()
}

impl VersionKind {
    /// Wraps a versions spec in a kind document.
    #[must_use]
    pub fn new(spec: VersionsSpec) -> Self {
        Self {
            api_version: super::default_api_version(),
            kind: default_version_kind(),
            spec,
        }
    }

    /// See [`VersionsSpec::verify`].
    ///
    /// # Errors
    ///
    /// Returns `VerifyFailure` when `check` is set and an invariant is violated.
    pub fn verify(&self, check: bool) -> Result<bool> {
        self.spec.verify(check)
    }
}

/// A version slot of a project, either the single version or one of many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "slot", rename_all = "lowercase")]
pub enum Version {
    /// The single version.
    One(OneSpec),
    /// One of the side-by-side versions.
    Multi(MultiSpec),
}

impl Version {
    /// Application version.
    #[must_use]
    pub fn app_version(&self) -> &str {
        match self {
            Self::One(v) => &v.app_version,
            Self::Multi(v) => &v.app_version,
        }
    }

    /// Chart version.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::One(v) => v.version.as_deref(),
            Self::Multi(v) => v.version.as_deref(),
        }
    }

    /// Build identifier.
    #[must_use]
    pub fn build(&self) -> Option<&str> {
        match self {
            Self::One(v) => v.build.as_deref(),
            Self::Multi(v) => v.build.as_deref(),
        }
    }

    /// Extra package manager arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        match self {
            Self::One(v) => v.args.as_deref().unwrap_or_default(),
            Self::Multi(v) => v.args.as_deref().unwrap_or_default(),
        }
    }

    /// Canary weight, always `None` for the single version.
    #[must_use]
    pub const fn weight(&self) -> Option<u32> {
        match self {
            Self::One(_) => None,
            Self::Multi(v) => v.weight,
        }
    }

    /// Profiles the release is installed with.
    #[must_use]
    pub fn profiles(&self) -> Vec<Profile> {
        let mut profiles = vec![Profile::Default];
        if let Self::Multi(v) = self
            && v.weight.is_some()
        {
            if v.dedicated_endpoints.unwrap_or(false) {
                profiles.push(Profile::CanaryDedicatedEndpoints);
            } else {
                profiles.push(Profile::Canary);
            }
        }
        profiles
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(v) => write!(f, "one/{}", v.app_version),
            Self::Multi(v) => match v.weight {
                Some(w) => write!(f, "multi/{} (weight {w})", v.app_version),
                None => write!(f, "multi/{}", v.app_version),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multi(versions: &[(&str, Option<u32>)]) -> VersionsSpec {
        VersionsSpec {
            one: None,
            multi: Some(
                versions
                    .iter()
                    .map(|(app, weight)| MultiSpec {
                        weight: *weight,
                        ..MultiSpec::new(*app)
                    })
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_weight_sum() {
        let spec = multi(&[("a", Some(10)), ("b", Some(50))]);
        assert!(!spec.verify(false).expect("query mode never fails"));
        tokio_test::assert_err!(spec.verify(true));

        let spec = multi(&[("a", Some(10)), ("b", Some(90))]);
        assert!(spec.verify(true).expect("valid spec"));
    }

    #[test]
    fn test_one_and_canary_exclusive() {
        let mut spec = multi(&[("2.0.0", Some(100))]);
        spec.one = Some(OneSpec::new("1.0.0"));
        let err = spec.verify(true).expect_err("one + canary must fail");
        assert!(err.to_string().contains("can not be used together"));

        // one next to unweighted multi versions is fine
        let mut spec = multi(&[("2.0.0", None), ("3.0.0", None)]);
        spec.one = Some(OneSpec::new("1.0.0"));
        assert!(spec.verify(true).expect("valid spec"));
    }

    #[test]
    fn test_duplicated_app_version() {
        let spec = multi(&[("2.0.0", None), ("2.0.0", None)]);
        assert!(!spec.verify(false).expect("query mode never fails"));

        let mut spec = multi(&[("1.0.0", None)]);
        spec.one = Some(OneSpec::new("1.0.0"));
        let err = spec.verify(true).expect_err("duplicate must fail");
        assert!(err.to_string().contains("'1.0.0' is duplicated"));
    }

    #[test]
    fn test_weight_out_of_range() {
        let spec = multi(&[("a", Some(150))]);
        assert!(!spec.verify(false).expect("query mode never fails"));
    }

    #[test]
    fn test_profiles() {
        assert_eq!(Version::One(OneSpec::new("1")).profiles(), vec![Profile::Default]);
        assert_eq!(Version::Multi(MultiSpec::new("1")).profiles(), vec![Profile::Default]);
        assert_eq!(
            Version::Multi(MultiSpec::new("1").with_weight(50)).profiles(),
            vec![Profile::Default, Profile::Canary]
        );

        let dedicated = MultiSpec {
            dedicated_endpoints: Some(true),
            ..MultiSpec::new("1").with_weight(50)
        };
        assert_eq!(
            Version::Multi(dedicated).profiles(),
            vec![Profile::Default, Profile::CanaryDedicatedEndpoints]
        );
    }

    #[test]
    fn test_parse_version_kind() {
        let yaml = r"
apiVersion: noops.local/v1alpha1
kind: Version
spec:
  multi:
    - app_version: 2.0.0
      weight: 40
      dedicated-endpoints: true
    - app_version: 3.0.0
      weight: 60
";
        let kind: VersionKind = serde_yaml::from_str(yaml).expect("valid version kind");
        assert!(kind.verify(true).expect("valid spec"));
        assert_eq!(kind.spec.canary_versions().len(), 2);
    }
}
