// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is reported
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are reported
#![warn(unused_variables)]            // Unused variables are reported
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # NoOps Deploy
//!
//! Multi-cluster target planning and helm release reconciliation for NoOps
//! projects.
//!
//! ## Overview
//!
//! A NoOps project is a helm chart shipped with value files, target files,
//! profile files and an optional kustomize tree. This crate:
//!
//! - Assigns clusters to the active, standby and services-only roles
//! - Builds a project plan saying which project each cluster runs
//! - Computes the release operations between two projects
//! - Drives helm (and the kustomize post-render hook) to apply them
//!
//! ## Architecture
//!
//! 1. **Targets**: a [`kinds::TargetKind`] and the cluster list give a
//!    [`kinds::TargetPlan`]
//! 2. **Plans**: the target plan, a [`kinds::VersionKind`] and a
//!    [`kinds::ProjectKind`] give a [`kinds::ProjectPlanKind`]
//! 3. **Reconciler**: per cluster, a [`planner::ReconciliationPlan`] is
//!    turned into helm uninstalls and upgrades
//!
//! ## Modules
//!
//! - [`kinds`]: Typed documents
//! - [`config`]: Settings, parsing, validation and hashing
//! - [`planner`]: Target, project and reconciliation planning
//! - [`package`]: Chart resolution and the helm executor
//! - [`reconciler`]: Cluster and plan application
//! - [`hpr`]: Helm post-render hook
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! apiVersion: noops.local/v1alpha1
//! kind: Target
//! spec:
//!   active:
//!     clustersCount: 1
//!   standby:
//!     clustersCount: Remaining
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod hpr;
pub mod kinds;
pub mod package;
pub mod planner;
pub mod reconciler;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{KindParser, KindValidator, Settings, SpecHasher};
pub use error::{NoopsError, Result};
pub use hpr::PostRenderer;
pub use package::HelmInstall;
pub use planner::{ProjectPlanner, ReconciliationPlan, TargetPlanner};
pub use reconciler::{PlanApplyReport, Reconciler};
