// src/graph/builder.rs

//! Task graph construction.
//!
//! Expands the requested projects × targets into concrete tasks, then
//! recursively resolves dependency rules into edges between tasks.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::config::model::{DependencyRule, DependencyRules, TargetDefault};
use crate::errors::{Result, RundagError};
use crate::graph::task::{Task, TargetSpec, TaskGraph};
use crate::project::ProjectGraph;
use crate::types::{ProjectName, TargetName, TaskId};

/// Merge workspace default dependency rules with run-specific extras.
///
/// Defaults are seeded first; extras are appended to (not replacing) matching
/// target entries. A target absent from the defaults takes exactly the extra
/// list.
pub fn merge_dependency_rules(
    defaults: &BTreeMap<TargetName, TargetDefault>,
    extra: &DependencyRules,
) -> DependencyRules {
    let mut merged: DependencyRules = BTreeMap::new();
    for (target, default) in defaults {
        merged.insert(target.clone(), default.depends_on.clone());
    }
    for (target, rules) in extra {
        merged
            .entry(target.clone())
            .or_default()
            .extend(rules.iter().cloned());
    }
    merged
}

/// Build the task graph for a run.
///
/// An empty `project_names` selects every project that defines one of the
/// requested targets; in that mode a project lacking some of the targets
/// simply contributes fewer tasks. With an explicit selection, a missing
/// project or a missing target on a selected project is a configuration
/// error. Dependency expansion is suppressed entirely when
/// `exclude_task_dependencies` is set.
pub fn create_task_graph(
    project_graph: &ProjectGraph,
    dependency_rules: &DependencyRules,
    project_names: &[ProjectName],
    targets: &[TargetName],
    configuration: Option<&str>,
    overrides: &BTreeMap<String, String>,
    exclude_task_dependencies: bool,
) -> Result<TaskGraph> {
    let mut builder = GraphBuilder {
        project_graph,
        dependency_rules,
        configuration,
        graph: TaskGraph::default(),
        by_spec: HashMap::new(),
    };

    let explicit = !project_names.is_empty();
    let selected: Vec<ProjectName> = if explicit {
        project_names.to_vec()
    } else {
        let defining: Vec<ProjectName> = project_graph
            .nodes
            .iter()
            .filter(|(_, node)| targets.iter().any(|target| node.targets.contains_key(target)))
            .map(|(name, _)| name.clone())
            .collect();
        if defining.is_empty() {
            return Err(RundagError::ConfigError(format!(
                "no project defines any of the requested targets: {}",
                targets.join(", ")
            )));
        }
        defining
    };

    let mut requested = Vec::new();
    for project in &selected {
        let node = project_graph.node(project).ok_or_else(|| {
            RundagError::ConfigError(format!("project '{project}' does not exist"))
        })?;
        for target in targets {
            if !node.targets.contains_key(target) {
                if explicit {
                    return Err(RundagError::ConfigError(format!(
                        "cannot find target '{target}' for project '{project}'"
                    )));
                }
                continue;
            }
            requested.push(builder.add_task(project, target, overrides));
        }
    }

    if exclude_task_dependencies {
        for id in builder.graph.tasks.keys().cloned().collect::<Vec<_>>() {
            builder.graph.dependencies.insert(id, Vec::new());
        }
    } else {
        let mut pending = requested;
        while let Some(id) = pending.pop() {
            if builder.graph.dependencies.contains_key(&id) {
                continue;
            }
            let deps = builder.resolve_dependencies(&id, &mut pending);
            builder.graph.dependencies.insert(id, deps);
        }
    }

    let mut graph = builder.graph;
    graph.recompute_roots();
    debug!(
        tasks = graph.tasks.len(),
        roots = graph.roots.len(),
        "task graph built"
    );
    Ok(graph)
}

struct GraphBuilder<'a> {
    project_graph: &'a ProjectGraph,
    dependency_rules: &'a DependencyRules,
    configuration: Option<&'a str>,
    graph: TaskGraph,
    /// (project, target) → task id, so a dependency-resolved task and a
    /// requested task for the same target never coexist as duplicates.
    by_spec: HashMap<(ProjectName, TargetName), TaskId>,
}

impl GraphBuilder<'_> {
    fn add_task(
        &mut self,
        project: &str,
        target: &str,
        overrides: &BTreeMap<String, String>,
    ) -> TaskId {
        let key = (project.to_string(), target.to_string());
        if let Some(id) = self.by_spec.get(&key) {
            return id.clone();
        }

        let spec = TargetSpec {
            project: project.to_string(),
            target: target.to_string(),
            configuration: self.configuration.map(|c| c.to_string()),
        };
        let id = spec.task_id(overrides);

        let target_config = self
            .project_graph
            .target(project, target)
            .cloned()
            .unwrap_or_default();
        let task = Task {
            id: id.clone(),
            target: spec,
            command: target_config.command,
            overrides: overrides.clone(),
            outputs: target_config.outputs,
            cache: target_config.cache,
            stream_output: target_config.stream_output,
        };

        self.graph.tasks.insert(id.clone(), task);
        self.by_spec.insert(key, id.clone());
        id
    }

    /// Resolve the dependency rules of one task into dependency task ids,
    /// creating dependency tasks as needed and queueing them for their own
    /// resolution.
    fn resolve_dependencies(&mut self, id: &TaskId, pending: &mut Vec<TaskId>) -> Vec<TaskId> {
        let (project, target) = {
            let task = &self.graph.tasks[id];
            (task.target.project.clone(), task.target.target.clone())
        };

        let rules = match self.dependency_rules.get(&target) {
            Some(rules) => rules.clone(),
            None => return Vec::new(),
        };

        let empty = BTreeMap::new();
        let mut deps = Vec::new();
        for rule in &rules {
            match rule {
                DependencyRule::OwnProject { target: dep_target } => {
                    if self.project_graph.target(&project, dep_target).is_some() {
                        let dep_id = self.add_task(&project, dep_target, &empty);
                        if dep_id != *id && !deps.contains(&dep_id) {
                            pending.push(dep_id.clone());
                            deps.push(dep_id);
                        }
                    }
                }
                DependencyRule::DependencyProjects { target: dep_target } => {
                    let mut seen = BTreeSet::new();
                    let mut dep_projects = Vec::new();
                    self.collect_dependency_projects(&project, dep_target, &mut seen, &mut dep_projects);
                    for dep_project in dep_projects {
                        let dep_id = self.add_task(&dep_project, dep_target, &empty);
                        if dep_id != *id && !deps.contains(&dep_id) {
                            pending.push(dep_id.clone());
                            deps.push(dep_id);
                        }
                    }
                }
            }
        }
        deps
    }

    /// Find the dependency projects exposing `target`, skipping through
    /// projects that do not expose it (their own dependencies are considered
    /// instead). The `seen` set guards against project-graph cycles.
    fn collect_dependency_projects(
        &self,
        project: &str,
        target: &str,
        seen: &mut BTreeSet<ProjectName>,
        found: &mut Vec<ProjectName>,
    ) {
        for dep in self.project_graph.dependencies_of(project) {
            if !seen.insert(dep.clone()) {
                continue;
            }
            if self.project_graph.target(dep, target).is_some() {
                found.push(dep.clone());
            } else {
                self.collect_dependency_projects(dep, target, seen, found);
            }
        }
    }
}
