// src/config/model.rs

//! Workspace configuration and the normalized run request.
//!
//! The workspace configuration mirrors what an orchestrator's workspace file
//! declares: target defaults (dependency rules, cache eligibility), runner
//! definitions keyed by name, global parallelism / cache-directory / daemon
//! settings and optional remote-accelerator credentials.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::RundagError;
use crate::types::{OutputStyle, ProjectName, TargetName};

/// A single dependency descriptor for a target.
///
/// Serialized as a string: `"^build"` means "depend on the `build` target of
/// dependency projects"; `"build"` means "depend on the `build` target of the
/// same project".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DependencyRule {
    /// Depend on `target` in every dependency project.
    DependencyProjects { target: TargetName },
    /// Depend on another `target` of the same project.
    OwnProject { target: TargetName },
}

impl TryFrom<String> for DependencyRule {
    type Error = RundagError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "^" {
            return Err(RundagError::ConfigError(format!(
                "invalid dependency rule '{s}' (expected a target name, optionally prefixed with '^')"
            )));
        }
        match trimmed.strip_prefix('^') {
            Some(target) => Ok(DependencyRule::DependencyProjects {
                target: target.to_string(),
            }),
            None => Ok(DependencyRule::OwnProject {
                target: trimmed.to_string(),
            }),
        }
    }
}

impl From<DependencyRule> for String {
    fn from(rule: DependencyRule) -> Self {
        match rule {
            DependencyRule::DependencyProjects { target } => format!("^{target}"),
            DependencyRule::OwnProject { target } => target,
        }
    }
}

/// Mapping from target name to its dependency descriptors.
pub type DependencyRules = BTreeMap<TargetName, Vec<DependencyRule>>;

/// Workspace-level defaults for a target name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetDefault {
    /// Whether tasks for this target are cache-eligible by default.
    #[serde(default)]
    pub cache: bool,
    #[serde(default)]
    pub depends_on: Vec<DependencyRule>,
}

/// Options configured on a named runner definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfiguredOptions {
    #[serde(default)]
    pub parallel: Option<usize>,
    #[serde(default)]
    pub cache_directory: Option<PathBuf>,
    #[serde(default)]
    pub cacheable_operations: Vec<TargetName>,
    #[serde(default)]
    pub use_daemon_process: Option<bool>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub encryption_key: Option<String>,
}

/// A named runner definition from the workspace configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerDefinition {
    /// Module reference: a relative path (resolved against the workspace
    /// root) or a globally resolvable runner identifier. Absent means
    /// "pick a built-in backend".
    #[serde(default)]
    pub runner: Option<String>,
    #[serde(default)]
    pub options: RunnerConfiguredOptions,
}

/// Remote-accelerator credentials from the workspace configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcceleratorSettings {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub encryption_key: Option<String>,
}

/// Workspace configuration consumed by the execution core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub target_defaults: BTreeMap<TargetName, TargetDefault>,
    /// Runner definitions keyed by name. The name `"default"` configures the
    /// runner used when the request does not name one.
    #[serde(default)]
    pub runners: BTreeMap<String, RunnerDefinition>,
    #[serde(default)]
    pub parallel: Option<usize>,
    #[serde(default)]
    pub cache_directory: Option<PathBuf>,
    #[serde(default)]
    pub use_daemon_process: Option<bool>,
    #[serde(default)]
    pub accelerator: AcceleratorSettings,
}

impl WorkspaceConfig {
    /// Target names whose workspace default marks them cache-eligible.
    pub fn default_cacheable_operations(&self) -> Vec<TargetName> {
        self.target_defaults
            .iter()
            .filter(|(_, d)| d.cache)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// The normalized run request. Parsing command-line arguments into this
/// shape happens outside the core.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunRequest {
    /// Targets to run (e.g. `["build"]`).
    pub targets: Vec<TargetName>,
    /// Named configuration applied to every requested task.
    pub configuration: Option<String>,
    /// Requested project names.
    pub projects: Vec<ProjectName>,
    /// Runner name; `None` means `"default"`.
    pub runner: Option<String>,
    pub parallel: Option<usize>,
    pub output_style: Option<OutputStyle>,
    /// Break cycles instead of aborting (same effect as `RUNDAG_IGNORE_CYCLES`).
    pub ignore_cycles: bool,
    pub verbose: bool,
}
