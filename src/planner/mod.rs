//! Planning module for deployment operations.
//!
//! This module turns intents into plans: clusters per role, project plans per
//! cluster group, and release operations per reconciliation.

pub(crate) mod projects;
pub(crate) mod reconcile;
pub(crate) mod targets;

pub use projects::ProjectPlanner;
pub use reconcile::ReconciliationPlan;
pub use targets::TargetPlanner;
