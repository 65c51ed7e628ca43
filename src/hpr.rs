//! Helm post-render hook.
//!
//! Helm pipes the rendered manifests into the hook; the hook drops them in the
//! kustomize base layer and answers with `kustomize build` of the overlay.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::package::kustomize::{HPR_FILE_ENV, RENDERED_MANIFESTS};
use crate::package::{CommandRunner, CommandSpec, HprDescriptor, ProcessRunner};

/// Post-render hook driving kustomize.
#[derive(Debug, Clone)]
pub struct PostRenderer {
    runner: Arc<dyn CommandRunner>,
    kustomize: String,
}

impl PostRenderer {
    /// Creates a hook running commands through `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            kustomize: "kustomize".to_string(),
        }
    }

    /// Creates a hook running real processes.
    #[must_use]
    pub fn with_processes() -> Self {
        Self::new(Arc::new(ProcessRunner::new()))
    }

    /// Sets the kustomize binary.
    #[must_use]
    pub fn with_kustomize(mut self, kustomize: impl Into<String>) -> Self {
        self.kustomize = kustomize.into();
        self
    }

    /// Descriptor location: `NOOPS_HPR_FILE` when set, else inside `workdir`.
    #[must_use]
    pub fn descriptor_path(lookup: impl Fn(&str) -> Option<String>, workdir: &Path) -> PathBuf {
        lookup(HPR_FILE_ENV)
            .filter(|path| !path.is_empty())
            .map_or_else(|| HprDescriptor::path_in(workdir), PathBuf::from)
    }

    /// Renders `manifests` through the layout described at `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is unreadable, the manifests cannot
    /// be written or kustomize fails.
    pub async fn render(&self, descriptor: &Path, manifests: &[u8]) -> Result<String> {
        let hpr = HprDescriptor::read(descriptor).await?;
        debug!("Post-rendering with {}", descriptor.display());

        let rendered = hpr.base.join(RENDERED_MANIFESTS);
        tokio::fs::write(&rendered, manifests).await?;
        info!(
            "Wrote {} bytes to {}, building {}",
            manifests.len(),
            rendered.display(),
            hpr.kustomize.display()
        );

        let build = CommandSpec::new(&self.kustomize)
            .arg("build")
            .arg(hpr.kustomize.display().to_string())
            .read_only();
        let output = self.runner.run(&build).await?;
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::CommandOutput;
    use crate::package::command::fake::RecordingRunner;
    use tempfile::TempDir;

    #[test]
    fn test_descriptor_path() {
        let workdir = Path::new("/work");

        let from_env =
            PostRenderer::descriptor_path(|_| Some("/tmp/hpr.yaml".to_string()), workdir);
        assert_eq!(from_env, PathBuf::from("/tmp/hpr.yaml"));

        let default = PostRenderer::descriptor_path(|_| None, workdir);
        assert_eq!(default, PathBuf::from("/work/noopshpr.yaml"));

        let empty = PostRenderer::descriptor_path(|_| Some(String::new()), workdir);
        assert_eq!(empty, PathBuf::from("/work/noopshpr.yaml"));
    }

    #[tokio::test]
    async fn test_render() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let base = dir.path().join("kustomize/base");
        let overlay = dir.path().join("kustomize/dev");
        std::fs::create_dir_all(&base).expect("base");
        std::fs::create_dir_all(&overlay).expect("overlay");

        let descriptor = dir.path().join("noopshpr.yaml");
        HprDescriptor {
            base: base.clone(),
            kustomize: overlay.clone(),
        }
        .write(&descriptor)
        .await
        .expect("descriptor");

        let runner = Arc::new(RecordingRunner::with_handler(|_| {
            Ok(CommandOutput::ok("kind: Deployment\n"))
        }));
        let hook = PostRenderer::new(runner.clone()).with_kustomize("kz");

        let output = hook
            .render(&descriptor, b"kind: Service\n")
            .await
            .expect("render");

        assert_eq!(output, "kind: Deployment\n");
        assert_eq!(
            std::fs::read_to_string(base.join("all.yaml")).expect("manifests"),
            "kind: Service\n"
        );
        assert_eq!(
            runner.lines(),
            vec![format!("kz build {}", overlay.display())]
        );
    }

    #[tokio::test]
    async fn test_render_without_descriptor() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let runner = Arc::new(RecordingRunner::succeeding());
        let hook = PostRenderer::new(runner.clone());

        let result = hook.render(&dir.path().join("missing.yaml"), b"").await;
        assert!(result.is_err());
        assert!(runner.calls().is_empty());
    }
}
