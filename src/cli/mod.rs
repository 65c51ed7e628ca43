//! CLI module for the NoOps deployment tool.
//!
//! This module provides the command-line interface for planning targets,
//! building project plans and reconciling helm releases on clusters.

mod commands;
mod output;

pub use commands::{
    Cli, Commands, OutputFormat, ProjectsCommands, TargetsCommands, VersionsCommands,
};
pub use output::OutputFormatter;
