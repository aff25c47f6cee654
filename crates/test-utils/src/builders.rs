#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use rundag::config::model::{
    DependencyRule, RunRequest, RunnerConfiguredOptions, RunnerDefinition, TargetDefault,
    WorkspaceConfig,
};
use rundag::project::{FileData, InputSpec, ProjectFileMap, ProjectGraph, ProjectNode, TargetConfig};

/// Builder for `ProjectGraph` to simplify test setup.
pub struct ProjectGraphBuilder {
    graph: ProjectGraph,
}

impl ProjectGraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: ProjectGraph::default(),
        }
    }

    /// Add a project with no dependencies. Targets are added via the node.
    pub fn with_project(mut self, node: ProjectNode) -> Self {
        self.graph
            .dependencies
            .entry(node.name.clone())
            .or_default();
        self.graph.nodes.insert(node.name.clone(), node);
        self
    }

    /// Declare that `project` depends on `dependency`.
    pub fn with_dependency(mut self, project: &str, dependency: &str) -> Self {
        self.graph
            .dependencies
            .entry(project.to_string())
            .or_default()
            .push(dependency.to_string());
        self
    }

    pub fn build(self) -> ProjectGraph {
        self.graph
    }
}

impl Default for ProjectGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ProjectNode`.
pub struct ProjectNodeBuilder {
    node: ProjectNode,
}

impl ProjectNodeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            node: ProjectNode {
                name: name.to_string(),
                root: PathBuf::from(name),
                targets: BTreeMap::new(),
            },
        }
    }

    pub fn root(mut self, root: &str) -> Self {
        self.node.root = PathBuf::from(root);
        self
    }

    pub fn with_target(mut self, name: &str, target: TargetConfig) -> Self {
        self.node.targets.insert(name.to_string(), target);
        self
    }

    pub fn build(self) -> ProjectNode {
        self.node
    }
}

/// Builder for `TargetConfig`.
pub struct TargetConfigBuilder {
    target: TargetConfig,
}

impl TargetConfigBuilder {
    pub fn new() -> Self {
        Self {
            target: TargetConfig::default(),
        }
    }

    pub fn command(mut self, cmd: &str) -> Self {
        self.target.command = Some(cmd.to_string());
        self
    }

    pub fn cache(mut self, val: bool) -> Self {
        self.target.cache = val;
        self
    }

    pub fn stream_output(mut self, val: bool) -> Self {
        self.target.stream_output = val;
        self
    }

    pub fn files_input(mut self, glob: &str) -> Self {
        self.target.inputs.push(InputSpec::Files(glob.to_string()));
        self
    }

    pub fn env_input(mut self, name: &str) -> Self {
        self.target.inputs.push(InputSpec::Env(name.to_string()));
        self
    }

    pub fn dependency_outputs_input(mut self) -> Self {
        self.target.inputs.push(InputSpec::DependencyOutputs);
        self
    }

    pub fn output(mut self, path: &str) -> Self {
        self.target.outputs.push(path.to_string());
        self
    }

    pub fn build(self) -> TargetConfig {
        self.target
    }
}

impl Default for TargetConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `WorkspaceConfig`.
pub struct WorkspaceConfigBuilder {
    workspace: WorkspaceConfig,
}

impl WorkspaceConfigBuilder {
    pub fn new() -> Self {
        Self {
            workspace: WorkspaceConfig::default(),
        }
    }

    pub fn with_target_default(mut self, target: &str, default: TargetDefault) -> Self {
        self.workspace
            .target_defaults
            .insert(target.to_string(), default);
        self
    }

    /// Shorthand: `target` depends on `rules` given in string form
    /// (`"^build"` / `"build"`).
    pub fn with_depends_on(mut self, target: &str, rules: &[&str]) -> Self {
        let parsed: Vec<DependencyRule> = rules
            .iter()
            .map(|rule| {
                DependencyRule::try_from(rule.to_string())
                    .expect("invalid dependency rule in test builder")
            })
            .collect();
        self.workspace
            .target_defaults
            .entry(target.to_string())
            .or_default()
            .depends_on = parsed;
        self
    }

    pub fn with_runner(mut self, name: &str, definition: RunnerDefinition) -> Self {
        self.workspace.runners.insert(name.to_string(), definition);
        self
    }

    pub fn with_runner_options(mut self, name: &str, options: RunnerConfiguredOptions) -> Self {
        self.workspace.runners.insert(
            name.to_string(),
            RunnerDefinition {
                runner: None,
                options,
            },
        );
        self
    }

    pub fn parallel(mut self, val: usize) -> Self {
        self.workspace.parallel = Some(val);
        self
    }

    pub fn cache_directory(mut self, path: &str) -> Self {
        self.workspace.cache_directory = Some(PathBuf::from(path));
        self
    }

    pub fn use_daemon_process(mut self, val: bool) -> Self {
        self.workspace.use_daemon_process = Some(val);
        self
    }

    pub fn accelerator_access_token(mut self, token: &str) -> Self {
        self.workspace.accelerator.access_token = Some(token.to_string());
        self
    }

    pub fn build(self) -> WorkspaceConfig {
        self.workspace
    }
}

impl Default for WorkspaceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A run request for the given targets across the given projects.
pub fn run_request(targets: &[&str], projects: &[&str]) -> RunRequest {
    RunRequest {
        targets: targets.iter().map(|t| t.to_string()).collect(),
        projects: projects.iter().map(|p| p.to_string()).collect(),
        ..RunRequest::default()
    }
}

/// A file map entry: `files` are `(path, content_digest)` pairs.
pub fn file_map(entries: &[(&str, &[(&str, &str)])]) -> ProjectFileMap {
    entries
        .iter()
        .map(|(project, files)| {
            (
                project.to_string(),
                files
                    .iter()
                    .map(|(path, hash)| FileData {
                        path: path.to_string(),
                        hash: hash.to_string(),
                    })
                    .collect(),
            )
        })
        .collect()
}
