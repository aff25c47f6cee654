// src/config/mod.rs

//! Workspace configuration loading and per-run switches.
//!
//! - [`model`] defines the workspace configuration and the normalized
//!   run request.
//! - [`file`] is the on-disk TOML shape (`Rundag.toml`).
//! - [`loader`] reads and validates the workspace file.
//! - [`run_config`] collects environment-driven switches once per run.

pub mod file;
pub mod loader;
pub mod model;
pub mod run_config;
mod validate;

pub use file::{RawProject, RawWorkspaceFile, WorkspaceFile};
pub use model::{
    AcceleratorSettings, DependencyRule, DependencyRules, RunRequest, RunnerConfiguredOptions,
    RunnerDefinition, TargetDefault, WorkspaceConfig,
};
pub use run_config::RunConfig;
