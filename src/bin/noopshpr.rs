//! NoOps helm post-render hook.
//!
//! Helm runs this binary with `--post-renderer`: rendered manifests arrive on
//! stdin, the kustomize build leaves on stdout. Logs go to stderr only.

use std::io::{Read, Write};
use std::process::ExitCode;

use noops_deploy::config::Settings;
use noops_deploy::error::Result;
use noops_deploy::hpr::PostRenderer;

use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let settings = Settings::load(None)?;

    let mut manifests = Vec::new();
    std::io::stdin().lock().read_to_end(&mut manifests)?;

    let descriptor =
        PostRenderer::descriptor_path(|name| std::env::var(name).ok(), &settings.workdir);
    let rendered = PostRenderer::with_processes()
        .with_kustomize(&settings.kustomize)
        .render(&descriptor, &manifests)
        .await?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
