//! Chart packaging and the helm executor.
//!
//! This module turns a project version into `helm` invocations:
//! - Resolving charts from a repository or a local archive
//! - Selecting value, target and profile files shipped with the chart
//! - Preparing the kustomize post-render hook
//! - Running pre-processing scripts and the final upgrade

pub mod archive;
pub mod command;
pub mod helm;
pub mod kustomize;
pub mod profiles;
pub mod release;
pub mod values;

pub use command::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use helm::{ChartRef, HelmInstall, RepoLock, UpgradeRequest};
pub use kustomize::HprDescriptor;
pub use profiles::ProfileGate;
pub use release::label_rfc1035;
