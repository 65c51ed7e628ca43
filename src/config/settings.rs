//! Runtime settings: binaries, work directory and reconciliation options.
//!
//! Defaults are overridden by `NOOPS_*` environment variables, themselves
//! optionally loaded from a `.env` file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{ConfigError, NoopsError, Result};

/// Environment variable overriding the work directory.
pub const ENV_WORKDIR: &str = "NOOPS_WORKDIR";
/// Environment variable overriding the helm binary.
pub const ENV_HELM: &str = "NOOPS_HELM";
/// Environment variable overriding the kustomize binary.
pub const ENV_KUSTOMIZE: &str = "NOOPS_KUSTOMIZE";
/// Environment variable overriding the post-render hook.
pub const ENV_HPR: &str = "NOOPS_HPR";
/// Environment variable selecting the canary aggregate template.
pub const ENV_CANARY_TEMPLATE: &str = "NOOPS_CANARY_TEMPLATE";
/// Environment variable pointing to the pre-processing scripts.
pub const ENV_PREPROCESSING: &str = "NOOPS_PREPROCESSING";

/// Which weighted version the canary aggregate release is built from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CanaryTemplate {
    /// The first weighted version, in declaration order.
    First,
    /// The last weighted version, in declaration order.
    #[default]
    Last,
}

impl FromStr for CanaryTemplate {
    type Err = NoopsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Err(ConfigError::InvalidEnvVar {
                name: ENV_CANARY_TEMPLATE.to_string(),
                message: format!("'{other}' is neither 'first' nor 'last'"),
            }
            .into()),
        }
    }
}

impl fmt::Display for CanaryTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Last => write!(f, "last"),
        }
    }
}

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Directory for generated files (post-render descriptor).
    pub workdir: PathBuf,
    /// Helm binary.
    pub helm: String,
    /// Kustomize binary, used by the post-render hook.
    pub kustomize: String,
    /// Post-render hook binary.
    pub hook: String,
    /// Canary aggregate template.
    pub canary_template: CanaryTemplate,
    /// Pre-processing scripts directory.
    pub preprocessing: Option<PathBuf>,
    /// Log mutating commands instead of running them.
    pub dry_run: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("noops_workdir"),
            helm: "helm".to_string(),
            kustomize: "kustomize".to_string(),
            hook: "noopshpr".to_string(),
            canary_template: CanaryTemplate::default(),
            preprocessing: None,
            dry_run: false,
        }
    }
}

impl Settings {
    /// Loads `.env` from `base_path` (or the current directory), then reads
    /// the environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if `.env` is unreadable or an override is invalid.
    pub fn load(base_path: Option<&Path>) -> Result<Self> {
        load_dotenv(base_path)?;
        let mut settings = Self::default();
        settings.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Applies the `NOOPS_*` overrides returned by `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if `NOOPS_CANARY_TEMPLATE` is invalid.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(workdir) = lookup(ENV_WORKDIR) {
            debug!("Overriding workdir from environment");
            self.workdir = PathBuf::from(workdir);
        }
        if let Some(helm) = lookup(ENV_HELM) {
            debug!("Overriding helm binary from environment");
            self.helm = helm;
        }
        if let Some(kustomize) = lookup(ENV_KUSTOMIZE) {
            debug!("Overriding kustomize binary from environment");
            self.kustomize = kustomize;
        }
        if let Some(hook) = lookup(ENV_HPR) {
            debug!("Overriding post-render hook from environment");
            self.hook = hook;
        }
        if let Some(template) = lookup(ENV_CANARY_TEMPLATE) {
            self.canary_template = template.parse()?;
        }
        if let Some(dir) = lookup(ENV_PREPROCESSING) {
            self.preprocessing = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Sets the work directory.
    #[must_use]
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Sets dry-run.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Loads the `.env` file if present.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be loaded.
pub fn load_dotenv(base_path: Option<&Path>) -> Result<()> {
    let env_path = base_path.map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

    if env_path.exists() {
        info!("Loading environment from: {}", env_path.display());
        dotenvy::from_path(&env_path).map_err(|e| ConfigError::ParseError {
            message: format!("Failed to load .env file: {e}"),
            location: Some(env_path.display().to_string()),
        })?;
    } else {
        debug!(".env file not found at: {}", env_path.display());
    }

    Ok(())
}
