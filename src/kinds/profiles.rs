//! Deployment profiles and the profile classes a chart can support.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named deployment variant mapped to `noops/profile-<name>.yaml`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Base profile of every release.
    Default,
    /// Weighted canary instance.
    Canary,
    /// Canary aggregate release exposing the endpoints only.
    CanaryEndpointsOnly,
    /// Canary instance with its own endpoints.
    CanaryDedicatedEndpoints,
    /// Release with its own endpoints.
    DedicatedEndpoints,
    /// Backing services without user-facing endpoints.
    ServicesOnly,
}

impl Profile {
    /// Name used in value-file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Canary => "canary",
            Self::CanaryEndpointsOnly => "canary-endpoints-only",
            Self::CanaryDedicatedEndpoints => "canary-dedicated-endpoints",
            Self::DedicatedEndpoints => "dedicated-endpoints",
            Self::ServicesOnly => "services-only",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Profile classes a chart declares it supports.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileClasses {
    /// Canary releases.
    #[serde(default)]
    pub canary: bool,
    /// Blue/green releases.
    #[serde(rename = "blue-green", default)]
    pub blue_green: bool,
    /// Dedicated endpoints.
    #[serde(rename = "dedicated-endpoints", default)]
    pub dedicated_endpoints: bool,
    /// Services-only installs.
    #[serde(rename = "services-only", default)]
    pub services_only: bool,
}
