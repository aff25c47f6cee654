// src/config/file.rs

//! On-disk workspace file (`Rundag.toml`).
//!
//! Project discovery is an external concern; the workspace file carries an
//! inline project section so the standalone binary has a project graph to
//! work from. Embedders that discover projects elsewhere construct a
//! [`ProjectGraph`] directly and never touch this module.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::model::WorkspaceConfig;
use crate::project::{ProjectGraph, ProjectNode, TargetConfig};
use crate::types::{ProjectName, TargetName};

/// A project entry in the workspace file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProject {
    /// Project directory relative to the workspace root. Defaults to the
    /// project name.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Names of projects this project depends on.
    #[serde(default)]
    pub depends_on: Vec<ProjectName>,
    #[serde(default)]
    pub targets: BTreeMap<TargetName, TargetConfig>,
}

/// Raw, unvalidated workspace file as deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawWorkspaceFile {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub project: BTreeMap<ProjectName, RawProject>,
}

/// Validated workspace file: workspace settings plus the project graph.
#[derive(Debug, Clone)]
pub struct WorkspaceFile {
    pub workspace: WorkspaceConfig,
    pub project_graph: ProjectGraph,
}

impl WorkspaceFile {
    /// Construct without validation. Prefer `TryFrom<RawWorkspaceFile>`.
    pub(crate) fn new_unchecked(workspace: WorkspaceConfig, project_graph: ProjectGraph) -> Self {
        Self {
            workspace,
            project_graph,
        }
    }
}
