// src/project.rs

//! Read-only project graph types.
//!
//! Project discovery is an external collaborator; this module only defines
//! the shape the execution core consumes: project names, the targets each
//! project exposes, and dependency edges between projects.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{ProjectName, TargetName};

/// A named input a target declares for fingerprinting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSpec {
    /// Project files matching a glob pattern (relative to the project root).
    Files(String),
    /// The value of an environment variable.
    Env(String),
    /// The produced artifacts of dependency tasks. Tasks declaring this
    /// cannot be fingerprinted before their dependencies have run.
    DependencyOutputs,
}

/// A target a project exposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Shell command to run. Targets without a command complete trivially.
    #[serde(default)]
    pub command: Option<String>,
    /// Declared fingerprint inputs. Empty means "all project files".
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    /// Output locations, recorded in the task for cache restoration.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Whether results of this target may be cached.
    #[serde(default)]
    pub cache: bool,
    /// Whether this target's output must be streamed live to the terminal.
    #[serde(default)]
    pub stream_output: bool,
}

/// A node in the project graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectNode {
    pub name: ProjectName,
    /// Project directory, relative to the workspace root.
    #[serde(default)]
    pub root: PathBuf,
    #[serde(default)]
    pub targets: BTreeMap<TargetName, TargetConfig>,
}

/// The project graph: projects, their targets, and inter-project dependency
/// edges. Immutable input to the execution core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectGraph {
    pub nodes: BTreeMap<ProjectName, ProjectNode>,
    /// `dependencies[p]` lists the projects `p` depends on.
    #[serde(default)]
    pub dependencies: BTreeMap<ProjectName, Vec<ProjectName>>,
}

impl ProjectGraph {
    pub fn node(&self, name: &str) -> Option<&ProjectNode> {
        self.nodes.get(name)
    }

    pub fn dependencies_of(&self, name: &str) -> &[ProjectName] {
        self.dependencies
            .get(name)
            .map(|deps| deps.as_slice())
            .unwrap_or(&[])
    }

    pub fn target(&self, project: &str, target: &str) -> Option<&TargetConfig> {
        self.node(project)?.targets.get(target)
    }
}

/// A single file with its content digest, as supplied by the (external)
/// file discovery layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileData {
    /// Path relative to the project root.
    pub path: String,
    /// Content digest (opaque to the core; any stable digest will do).
    pub hash: String,
}

/// Per-project file listing with content digests.
pub type ProjectFileMap = BTreeMap<ProjectName, Vec<FileData>>;
