//! Helm install/upgrade executor.
//!
//! One upgrade resolves the chart (repository search or local archive),
//! assembles the value, target and profile arguments from the files the
//! chart ships, runs the chart's pre-processing scripts and finally calls
//! `helm upgrade --install`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{NoopsError, PackageError, Result};
use crate::kinds::{ChartKind, Profile, Target};

use super::archive::{extract_chart, is_local_archive};
use super::command::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
use super::kustomize::{HPR_FILE_ENV, HprDescriptor};
use super::profiles::ProfileGate;
use super::release::label_rfc1035;
use super::values::{target_args, values_args};

/// Serializes `helm repo update` across executors.
pub type RepoLock = Arc<Mutex<()>>;

/// Default helm binary.
pub const DEFAULT_HELM: &str = "helm";

/// Default post-render hook binary.
pub const DEFAULT_HOOK: &str = "noopshpr";

/// Chart resolved from a repository search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChartRef {
    /// Qualified chart name (`repo/chart`).
    pub name: String,
    /// Chart version.
    pub version: String,
}

impl ChartRef {
    /// Chart name without the repository prefix.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Everything one `helm upgrade` needs.
#[derive(Debug, Clone, Default)]
pub struct UpgradeRequest {
    /// Kubernetes namespace.
    pub namespace: String,
    /// Release name, sanitized before use.
    pub release: String,
    /// Search keyword or local archive path.
    pub chart: String,
    /// Environment name.
    pub env: String,
    /// Directory holding the pre-processing scripts, the chart directory when unset.
    pub preprocessing: Option<PathBuf>,
    /// Profiles, in order.
    pub profiles: Vec<Profile>,
    /// Trailing helm arguments.
    pub extra_args: Vec<String>,
    /// Environment for pre-processing scripts.
    pub extra_envs: BTreeMap<String, String>,
    /// Target role.
    pub target: Option<Target>,
}

/// Runs helm against one cluster.
#[derive(Debug, Clone)]
pub struct HelmInstall {
    runner: Arc<dyn CommandRunner>,
    helm: String,
    hook: String,
    workdir: PathBuf,
    dry_run: bool,
    kube_context: Option<String>,
    repo_lock: RepoLock,
}

impl HelmInstall {
    /// Creates an executor using `runner` and writing into `workdir`.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            helm: DEFAULT_HELM.to_string(),
            hook: DEFAULT_HOOK.to_string(),
            workdir: workdir.into(),
            dry_run: false,
            kube_context: None,
            repo_lock: RepoLock::default(),
        }
    }

    /// Creates an executor launching real processes.
    #[must_use]
    pub fn with_processes(workdir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(ProcessRunner::new()), workdir)
    }

    /// Sets the helm binary.
    #[must_use]
    pub fn with_helm(mut self, helm: impl Into<String>) -> Self {
        self.helm = helm.into();
        self
    }

    /// Sets the post-render hook binary.
    #[must_use]
    pub fn with_hook(mut self, hook: impl Into<String>) -> Self {
        self.hook = hook.into();
        self
    }

    /// Logs mutating commands instead of running them.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Appends `--kube-context <context>` to every helm call.
    #[must_use]
    pub fn with_kube_context(mut self, context: Option<String>) -> Self {
        self.kube_context = context;
        self
    }

    /// Shares `lock` for repository refreshes.
    #[must_use]
    pub fn with_repo_lock(mut self, lock: RepoLock) -> Self {
        self.repo_lock = lock;
        self
    }

    /// The repository lock of this executor.
    #[must_use]
    pub fn repo_lock(&self) -> RepoLock {
        Arc::clone(&self.repo_lock)
    }

    /// Kube context, if any.
    #[must_use]
    pub fn kube_context(&self) -> Option<&str> {
        self.kube_context.as_deref()
    }

    /// Whether mutating commands are suppressed.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Path of the post-render descriptor.
    #[must_use]
    pub fn hpr_file(&self) -> PathBuf {
        HprDescriptor::path_in(&self.workdir)
    }

    fn helm_command(&self, args: Vec<String>) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.helm).args(args);
        if let Some(context) = &self.kube_context {
            spec = spec.arg("--kube-context").arg(context);
        }
        spec
    }

    async fn exec(&self, spec: CommandSpec) -> Result<CommandOutput> {
        if self.dry_run && spec.mutating {
            warn!("[dry-run] {spec}");
            return Ok(CommandOutput::default());
        }
        self.runner.run(&spec).await
    }

    /// Refreshes the chart repositories.
    ///
    /// # Errors
    ///
    /// Returns an error if helm fails.
    pub async fn update(&self) -> Result<()> {
        let _guard = self.repo_lock.lock().await;
        debug!("Refreshing chart repositories");
        self.exec(
            self.helm_command(vec!["repo".to_string(), "update".to_string()])
                .read_only(),
        )
        .await?;
        Ok(())
    }

    async fn search(&self, keyword: &str) -> Result<Option<ChartRef>> {
        let spec = self
            .helm_command(vec![
                "search".to_string(),
                "repo".to_string(),
                keyword.to_string(),
                "-o".to_string(),
                "json".to_string(),
            ])
            .read_only();
        let command = spec.to_command_string();
        let output = self.exec(spec).await?;

        let entries: Vec<ChartRef> =
            serde_json::from_str(output.stdout.trim()).map_err(|e| PackageError::InvalidOutput {
                command,
                message: e.to_string(),
            })?;
        Ok(entries.into_iter().next())
    }

    /// Finds the chart matching `keyword`, refreshing the repositories first
    /// and once more before a single retry.
    ///
    /// # Errors
    ///
    /// Returns `ChartNotFound` if both searches come back empty.
    pub async fn search_latest(&self, keyword: &str) -> Result<ChartRef> {
        self.update().await?;
        if let Some(chart) = self.search(keyword).await? {
            return Ok(chart);
        }

        warn!("No chart matches {keyword}, refreshing repositories and retrying");
        self.update().await?;
        self.search(keyword).await?.ok_or_else(|| {
            PackageError::ChartNotFound {
                keyword: keyword.to_string(),
            }
            .into()
        })
    }

    /// Downloads and unpacks `chart` into `dst`, returning the chart directory.
    ///
    /// # Errors
    ///
    /// Returns an error if helm fails.
    pub async fn pull(&self, chart: &ChartRef, dst: &Path) -> Result<PathBuf> {
        self.exec(
            self.helm_command(vec![
                "pull".to_string(),
                chart.name.clone(),
                "--version".to_string(),
                chart.version.clone(),
                "--untar".to_string(),
                "--untardir".to_string(),
                dst.display().to_string(),
            ])
            .read_only(),
        )
        .await?;
        Ok(dst.join(chart.short_name()))
    }

    async fn fetch(&self, chart: &str, dst: &Path) -> Result<PathBuf> {
        if is_local_archive(chart) {
            info!("Using local chart archive {chart}");
            let archive = PathBuf::from(chart);
            let dst = dst.to_path_buf();
            return tokio::task::spawn_blocking(move || extract_chart(&archive, &dst))
                .await
                .map_err(|e| NoopsError::internal(format!("archive extraction aborted: {e}")))?;
        }

        let found = self.search_latest(chart).await?;
        info!("Resolved {chart} to {} {}", found.name, found.version);
        self.pull(&found, dst).await
    }

    async fn preprocess(
        &self,
        request: &UpgradeRequest,
        chart: &ChartKind,
        chart_dir: &Path,
        args: &[String],
    ) -> Result<()> {
        let scripts_dir = request.preprocessing.as_deref().unwrap_or(chart_dir);

        for script in chart.pre_processing() {
            let path = scripts_dir.join(script);
            if !tokio::fs::try_exists(&path).await? {
                return Err(NoopsError::file_not_found(path));
            }

            info!("Pre-processing {} with {script}", request.release);
            let spec = CommandSpec::new(path.display().to_string())
                .args(["-e", request.env.as_str(), "-c"])
                .arg(chart_dir.display().to_string())
                .args(args.iter().cloned())
                .envs(&request.extra_envs)
                .cwd(chart_dir);
            self.exec(spec).await?;
        }
        Ok(())
    }

    /// Installs or upgrades one release.
    ///
    /// # Errors
    ///
    /// Returns an error if the chart cannot be resolved, an argument check
    /// fails or a command fails.
    pub async fn upgrade(&self, request: &UpgradeRequest) -> Result<()> {
        let release = label_rfc1035(&request.release);
        info!(
            "Upgrading release {release} in {} ({})",
            request.namespace, request.chart
        );

        let tmp = TempDir::new()?;
        let chart_dir = self.fetch(&request.chart, tmp.path()).await?;
        let chart = ChartKind::load(&chart_dir).await?;
        let supported = chart.supported();

        let mut values = values_args(&chart_dir, &request.env);
        values.extend(target_args(
            &chart_dir,
            &request.env,
            request.target,
            &supported.target_classes,
        )?);

        let mut post_renderer = Vec::new();
        let mut preprocessing_args = values.clone();
        if let Some(hpr) = HprDescriptor::resolve(&chart_dir, &request.env)? {
            hpr.write(&self.hpr_file()).await?;
            post_renderer = vec!["--post-renderer".to_string(), self.hook.clone()];
            // helm upgrade has no -k flag: kustomize runs behind the post-renderer,
            // only the pre-processing scripts take the layer directories.
            preprocessing_args.extend(hpr.kustomize_args());
        }

        self.preprocess(request, &chart, &chart_dir, &preprocessing_args)
            .await?;

        let profiles = ProfileGate::helm_profiles_args(
            &supported.profile_classes,
            &request.profiles,
            &chart_dir,
        )?;
        debug!("Values: {values:?}, profiles: {profiles:?}");

        let mut args = vec![
            "upgrade".to_string(),
            release,
            chart_dir.display().to_string(),
            "--install".to_string(),
            "--create-namespace".to_string(),
            "--namespace".to_string(),
            request.namespace.clone(),
        ];
        args.extend(values);
        args.extend(profiles);
        args.extend(post_renderer);
        args.extend(request.extra_args.iter().cloned());

        let spec = self
            .helm_command(args)
            .env(HPR_FILE_ENV, self.hpr_file().display().to_string());
        self.exec(spec).await?;
        Ok(())
    }

    /// Removes one release.
    ///
    /// # Errors
    ///
    /// Returns an error if helm fails.
    pub async fn uninstall(&self, namespace: &str, release: &str) -> Result<()> {
        let release = label_rfc1035(release);
        info!("Uninstalling release {release} from {namespace}");
        self.exec(self.helm_command(vec![
            "uninstall".to_string(),
            release,
            "--namespace".to_string(),
            namespace.to_string(),
        ]))
        .await?;
        Ok(())
    }
}
