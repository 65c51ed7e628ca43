//! Value-file selection under `<chart>/noops/`.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, TargetError};
use crate::kinds::{Target, TargetClasses};
use crate::planner::TargetPlanner;

/// Directory holding the value files inside a chart.
pub const VALUES_DIR: &str = "noops";

/// Suffix of the service-catalog value file.
pub const VALUES_SVCAT: &str = "svcat";

/// Path of `<chart>/noops/<file>`.
#[must_use]
pub fn values_file(chart_dir: &Path, file: &str) -> PathBuf {
    chart_dir.join(VALUES_DIR).join(file)
}

/// Appends `-f <file>` for every existing file, in order.
fn existing_files_args(files: impl IntoIterator<Item = PathBuf>) -> Vec<String> {
    let mut args = Vec::new();
    for file in files {
        if file.exists() {
            args.push("-f".to_string());
            args.push(file.display().to_string());
        } else {
            debug!("Skipping missing values file {}", file.display());
        }
    }
    args
}

/// `values-default.yaml`, `values-<env>.yaml` then `values-svcat.yaml`, each
/// when present.
#[must_use]
pub fn values_args(chart_dir: &Path, env: &str) -> Vec<String> {
    existing_files_args(
        ["default", env, VALUES_SVCAT]
            .into_iter()
            .map(|name| values_file(chart_dir, &format!("values-{name}.yaml"))),
    )
}

/// `target-<t>-default.yaml`, `target-<t>-<env>.yaml` then `target-<t>.yaml`,
/// each when present. Nothing without a target.
///
/// # Errors
///
/// Returns `TargetNotSupported` if the chart does not support the target.
pub fn target_args(
    chart_dir: &Path,
    env: &str,
    target: Option<Target>,
    supported: &TargetClasses,
) -> Result<Vec<String>> {
    let Some(target) = target else {
        return Ok(Vec::new());
    };

    if !TargetPlanner::is_compatible(target, supported) {
        return Err(TargetError::TargetNotSupported {
            target: target.to_string(),
            expected: Vec::new(),
        }
        .into());
    }

    let t = target.as_str();
    Ok(existing_files_args([
        values_file(chart_dir, &format!("target-{t}-default.yaml")),
        values_file(chart_dir, &format!("target-{t}-{env}.yaml")),
        values_file(chart_dir, &format!("target-{t}.yaml")),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chart_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir(dir.path().join(VALUES_DIR)).expect("Failed to create values dir");
        for file in files {
            std::fs::write(values_file(dir.path(), file), "{}").expect("Failed to write values");
        }
        dir
    }

    fn file_names(args: &[String]) -> Vec<String> {
        args.chunks(2)
            .map(|pair| {
                assert_eq!(pair[0], "-f");
                Path::new(&pair[1])
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
            .collect()
    }

    #[test]
    fn test_values_order_and_presence() {
        let chart = chart_with(&["values-svcat.yaml", "values-default.yaml", "values-prod.yaml"]);

        let args = values_args(chart.path(), "prod");
        assert_eq!(
            file_names(&args),
            vec!["values-default.yaml", "values-prod.yaml", "values-svcat.yaml"]
        );

        let args = values_args(chart.path(), "dev");
        assert_eq!(file_names(&args), vec!["values-default.yaml", "values-svcat.yaml"]);
    }

    #[test]
    fn test_target_args() {
        let chart = chart_with(&[
            "target-active.yaml",
            "target-active-default.yaml",
            "target-standby.yaml",
        ]);
        let supported = TargetClasses {
            active_standby: true,
            ..TargetClasses::default()
        };

        let args = target_args(chart.path(), "dev", Some(Target::Active), &supported)
            .expect("active is supported");
        assert_eq!(
            file_names(&args),
            vec!["target-active-default.yaml", "target-active.yaml"]
        );

        let args = target_args(chart.path(), "dev", None, &supported).expect("no target");
        assert!(args.is_empty());

        let err = target_args(chart.path(), "dev", Some(Target::OneCluster), &supported)
            .expect_err("one-cluster is not supported");
        assert!(err.to_string().contains("one-cluster"));
    }
}
