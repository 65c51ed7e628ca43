//! Project spec hashing for change detection.
//!
//! Digests identify the exact project applied to a cluster in plan output
//! and apply logs.

use sha2::{Digest, Sha256};

use crate::kinds::{InstallSpec, MultiSpec, OneSpec, ProjectPlanKind, ProjectSpec};

/// Hasher for project specs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecHasher;

impl SpecHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the digest of a project spec.
    #[must_use]
    pub fn hash_project(&self, spec: &ProjectSpec) -> String {
        let mut hasher = Sha256::new();

        hasher.update(self.hash_install(&spec.package.install).as_bytes());

        if let Some(one) = &spec.versions.one {
            hasher.update(b"one");
            hash_one(&mut hasher, one);
        }
        // Multi versions keep declaration order: it drives the canary instances.
        for multi in spec.versions.multi.iter().flatten() {
            hasher.update(b"multi");
            hash_multi(&mut hasher, multi);
        }

        hex::encode(hasher.finalize())
    }

    /// Computes the digest of the install settings.
    #[must_use]
    pub fn hash_install(&self, install: &InstallSpec) -> String {
        let mut hasher = Sha256::new();

        hasher.update(install.chart.as_bytes());
        hasher.update(install.env.as_bytes());
        if let Some(target) = install.target {
            hasher.update(target.as_str().as_bytes());
        }
        hasher.update([u8::from(install.services_only)]);
        for arg in install.args.iter().flatten() {
            hasher.update(arg.as_bytes());
        }
        // BTreeMap iterates sorted
        for (key, value) in install.envs.iter().flatten() {
            hasher.update(key.as_bytes());
            hasher.update(value.as_bytes());
        }
        if let Some(wl) = &install.white_label {
            hasher.update(wl.rebrand.as_bytes());
            hasher.update(wl.marketer.as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Computes the digest of a whole plan, clusters included.
    #[must_use]
    pub fn hash_plan(&self, plan: &ProjectPlanKind) -> String {
        let mut hasher = Sha256::new();

        hasher.update(plan.metadata.name.as_bytes());
        hasher.update(plan.metadata.namespace.as_bytes());
        for entry in &plan.spec.plan {
            for cluster in &entry.clusters {
                hasher.update(cluster.as_bytes());
            }
            hasher.update(self.hash_project(&entry.template.spec).as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// First 8 characters of a digest, for display.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}

fn hash_optional(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            hasher.update(v.as_bytes());
        }
        None => hasher.update([0u8]),
    }
}

fn hash_one(hasher: &mut Sha256, one: &OneSpec) {
    hasher.update(one.app_version.as_bytes());
    hash_optional(hasher, one.version.as_deref());
    hash_optional(hasher, one.build.as_deref());
    for arg in one.args.iter().flatten() {
        hasher.update(arg.as_bytes());
    }
}

fn hash_multi(hasher: &mut Sha256, multi: &MultiSpec) {
    hasher.update(multi.app_version.as_bytes());
    hash_optional(hasher, multi.version.as_deref());
    hash_optional(hasher, multi.build.as_deref());
    if let Some(weight) = multi.weight {
        hasher.update(weight.to_be_bytes());
    }
    hasher.update([u8::from(multi.dedicated_endpoints.unwrap_or(false))]);
    for arg in multi.args.iter().flatten() {
        hasher.update(arg.as_bytes());
    }
}
