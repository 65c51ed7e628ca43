//! Kustomize post-rendering layout.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConfigError, PackageError, Result};

/// Directory holding the kustomize tree inside a chart.
pub const KUSTOMIZE_DIR: &str = "kustomize";

/// Base layer directory name.
pub const KUSTOMIZE_BASE: &str = "base";

/// File name of the post-render descriptor inside the workdir.
pub const HPR_DESCRIPTOR: &str = "noopshpr.yaml";

/// Environment variable pointing the hook to its descriptor.
pub const HPR_FILE_ENV: &str = "NOOPS_HPR_FILE";

/// File the hook writes the rendered manifests into, inside the base layer.
pub const RENDERED_MANIFESTS: &str = "all.yaml";

/// Descriptor handed to the post-render hook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HprDescriptor {
    /// Base layer, receives the rendered manifests.
    pub base: PathBuf,
    /// Layer passed to `kustomize build`.
    pub kustomize: PathBuf,
}

impl HprDescriptor {
    /// Resolves the layout of the chart at `chart_dir` for `env`.
    ///
    /// Returns `None` when the chart has no kustomize tree.
    ///
    /// # Errors
    ///
    /// Returns `KustomizeStructure` when the env overlay has no base.
    pub fn resolve(chart_dir: &Path, env: &str) -> Result<Option<Self>> {
        let root = chart_dir.join(KUSTOMIZE_DIR);
        let base = root.join(KUSTOMIZE_BASE);
        let overlay = root.join(env);

        match (base.is_dir(), overlay.is_dir()) {
            (false, false) => {
                debug!("No kustomize layer in {}", chart_dir.display());
                Ok(None)
            }
            (false, true) => Err(PackageError::KustomizeStructure { path: overlay }.into()),
            (true, false) => Ok(Some(Self {
                kustomize: base.clone(),
                base,
            })),
            (true, true) => Ok(Some(Self {
                base,
                kustomize: overlay,
            })),
        }
    }

    /// Path of the descriptor inside `workdir`.
    #[must_use]
    pub fn path_in(workdir: &Path) -> PathBuf {
        workdir.join(HPR_DESCRIPTOR)
    }

    /// `-k <dir>` arguments for pre-processing scripts, base first.
    ///
    /// Helm never receives them; it reaches kustomize through the hook.
    #[must_use]
    pub fn kustomize_args(&self) -> Vec<String> {
        let mut args = vec!["-k".to_string(), self.base.display().to_string()];
        if self.kustomize != self.base {
            args.push("-k".to_string());
            args.push(self.kustomize.display().to_string());
        }
        args
    }

    /// Writes the descriptor as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn write(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
            location: None,
        })?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        debug!("Wrote post-render descriptor {}", path.display());
        Ok(())
    }

    /// Reads a descriptor written by [`HprDescriptor::write`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or invalid.
    pub async fn read(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        let content = tokio::fs::read_to_string(path).await?;
        serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                message: e.to_string(),
                location: Some(path.display().to_string()),
            }
            .into()
        })
    }
}
