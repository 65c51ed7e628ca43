//! Kind document loading.
//!
//! Every kind (targets, versions, projects, plans) and the cluster list is
//! read from YAML. JSON documents are accepted too, being valid YAML.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::kinds::Cluster;

/// Parser for kind documents.
#[derive(Debug, Default)]
pub struct KindParser;

impl KindParser {
    /// Creates a new parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Loads a kind document from a YAML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> Result<T> {
        let path = path.as_ref();
        info!("Loading {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a kind document from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is invalid.
    pub fn parse_yaml<T: DeserializeOwned>(&self, content: &str, source: Option<&Path>) -> Result<T> {
        debug!("Parsing {} bytes of YAML", content.len());

        serde_yaml::from_str(content).map_err(|e| {
            ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            }
            .into()
        })
    }

    /// Loads the cluster list.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_clusters(&self, path: impl AsRef<Path>) -> Result<Vec<Cluster>> {
        let clusters: Vec<Cluster> = self.load_file(path)?;
        debug!("Loaded {} clusters", clusters.len());
        Ok(clusters)
    }

    /// Renders a document as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized.
    pub fn to_yaml<T: Serialize>(&self, document: &T) -> Result<String> {
        serde_yaml::to_string(document).map_err(|e| {
            ConfigError::ParseError {
                message: format!("YAML serialization error: {e}"),
                location: None,
            }
            .into()
        })
    }

    /// Writes a document as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized or written.
    pub fn write_file<T: Serialize>(&self, path: impl AsRef<Path>, document: &T) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_yaml(document)?)?;
        info!("Wrote {}", path.display());
        Ok(())
    }
}
