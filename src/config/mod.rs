//! Configuration module for the NoOps deployment system.
//!
//! This module handles all configuration-related functionality:
//! - Runtime settings and their environment overrides
//! - Loading kind documents and the cluster list
//! - Validation of kind documents
//! - Computing project spec hashes for change detection

mod hash;
mod parser;
mod settings;
mod validator;

pub use hash::SpecHasher;
pub use parser::KindParser;
pub use settings::{
    CanaryTemplate, ENV_CANARY_TEMPLATE, ENV_HELM, ENV_HPR, ENV_KUSTOMIZE, ENV_PREPROCESSING,
    ENV_WORKDIR, Settings, load_dotenv,
};
pub use validator::{KindValidator, ValidationError, ValidationResult};
