// src/run_command.rs

//! Top-level run orchestration.
//!
//! Ties together graph construction, cycle safety, fingerprinting, lifecycle
//! composition, backend dispatch and outcome aggregation into one exit code.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, error, warn};

use crate::accelerator::AcceleratorClient;
use crate::config::model::{DependencyRules, RunRequest, WorkspaceConfig};
use crate::config::run_config::RunConfig;
use crate::errors::{Result, RundagError};
use crate::graph::task::{Task, TaskGraph};
use crate::graph::{create_task_graph, find_cycle, make_acyclic, merge_dependency_rules};
use crate::hasher::{
    DaemonTaskHasher, InProcessTaskHasher, TaskEnv, TaskHasher,
    hash_tasks_that_do_not_depend_on_outputs_of_other_tasks,
};
use crate::lifecycle::{
    CompositeLifeCycle, LifeCycle, LifecycleEvent, RunRecorderLifeCycle, SharedLifeCycle,
    TaskProfilingLifeCycle, TaskTimingsLifeCycle, notify, resolve_terminal_renderer,
};
use crate::project::{ProjectFileMap, ProjectGraph};
use crate::runner::{
    ContextHasher, RunnerContext, RunnerRegistry, exit_code, get_runner, normalize_invocation,
};
use crate::types::OutputStyle;

/// Caller-supplied extra options for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtraOptions {
    /// Suppress dependency expansion entirely.
    pub exclude_task_dependencies: bool,
    /// Load dot-env files before running tasks.
    pub load_dot_env_files: bool,
}

/// Everything the execution core needs from its external collaborators:
/// the discovered project graph, the workspace configuration, the file map
/// for in-process hashing, the optional accelerator, and the runner
/// registry populated at startup.
pub struct RunEnvironment {
    pub project_graph: Arc<ProjectGraph>,
    pub workspace: Arc<WorkspaceConfig>,
    pub workspace_root: PathBuf,
    pub file_map: ProjectFileMap,
    pub accelerator: Option<Arc<dyn AcceleratorClient>>,
    pub registry: RunnerRegistry,
    /// Environment snapshot hashing runs against.
    pub task_env: TaskEnv,
}

/// Run the requested targets and reduce everything to a process exit code.
///
/// Unrecoverable setup failures (cycle without an override, missing runner
/// configuration, unknown target) report a titled diagnostic and yield exit
/// code 1 before any task executes.
pub async fn run_command(
    env: &RunEnvironment,
    request: &RunRequest,
    overrides: &BTreeMap<String, String>,
    initiating_project: Option<&str>,
    extra_target_dependencies: &DependencyRules,
    extra: ExtraOptions,
) -> i32 {
    let run_config = Arc::new(RunConfig::resolve(request, extra.load_dot_env_files));
    let verbose = run_config.verbose;

    let result = run_command_inner(
        env,
        request,
        overrides,
        initiating_project,
        extra_target_dependencies,
        extra,
        run_config,
    )
    .await;

    handle_errors(verbose, result)
}

fn handle_errors(verbose: bool, result: Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(err) => {
            if verbose {
                error!(title = "command failed", error = ?err, "run aborted");
            } else {
                error!(title = "command failed", error = %err, "run aborted");
            }
            1
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_command_inner(
    env: &RunEnvironment,
    request: &RunRequest,
    overrides: &BTreeMap<String, String>,
    initiating_project: Option<&str>,
    extra_target_dependencies: &DependencyRules,
    extra: ExtraOptions,
    run_config: Arc<RunConfig>,
) -> Result<i32> {
    let rules = merge_dependency_rules(&env.workspace.target_defaults, extra_target_dependencies);

    let mut task_graph = create_task_graph(
        &env.project_graph,
        &rules,
        &request.projects,
        &request.targets,
        request.configuration.as_deref(),
        overrides,
        extra.exclude_task_dependencies,
    )?;

    validate_cycles(&mut task_graph, &run_config)?;

    let tasks: Vec<Task> = task_graph.tasks.values().cloned().collect();
    let (renderer, render_done) = resolve_terminal_renderer(&tasks, request, &run_config);

    let code = invoke_tasks_runner(
        env,
        request,
        run_config,
        Arc::new(task_graph),
        tasks,
        renderer,
        initiating_project,
    )
    .await?;

    // Guarantee all buffered terminal output has flushed before the exit
    // code is finalized.
    let _ = render_done.await;

    Ok(code)
}

/// Abort on a cycle, unless the run explicitly allows breaking it.
fn validate_cycles(task_graph: &mut TaskGraph, run_config: &RunConfig) -> Result<()> {
    let Some(cycle) = find_cycle(task_graph) else {
        return Ok(());
    };

    if run_config.ignore_cycles {
        warn!(
            title = "the task graph has a circular dependency",
            cycle = %cycle.join(" --> "),
            "breaking cycles because the override is set"
        );
        make_acyclic(task_graph);
        return Ok(());
    }

    Err(RundagError::GraphCycle(cycle))
}

/// Resolve the backend, compose the lifecycle bus, fingerprint eagerly, then
/// dispatch and aggregate.
async fn invoke_tasks_runner(
    env: &RunEnvironment,
    request: &RunRequest,
    run_config: Arc<RunConfig>,
    task_graph: Arc<TaskGraph>,
    tasks: Vec<Task>,
    renderer: Box<dyn LifeCycle>,
    initiating_project: Option<&str>,
) -> Result<i32> {
    let resolved = get_runner(request, &env.workspace, &env.workspace_root)?;

    let life_cycle = construct_life_cycles(&run_config, &resolved.options.cache_directory, request, renderer);

    // Select the fingerprint backend once per run.
    let hasher: Arc<dyn TaskHasher> = match env.accelerator.as_ref() {
        Some(client) if client.enabled() && resolved.options.use_daemon_process => {
            debug!("fingerprinting delegated to the accelerator");
            Arc::new(DaemonTaskHasher::new(Arc::clone(client)))
        }
        _ => Arc::new(InProcessTaskHasher::new(
            env.file_map.clone(),
            Arc::clone(&env.project_graph),
        )),
    };
    let task_env = Arc::new(env.task_env.clone());

    notify(
        &life_cycle,
        &LifecycleEvent::RunStarted {
            task_ids: tasks.iter().map(|task| task.id.clone()).collect(),
        },
    );

    // Eagerly fingerprint everything that does not need other tasks'
    // outputs: this fetches remote cache hits and gives a remote backend a
    // complete manifest up front.
    let hashing_started = Instant::now();
    let fingerprints = hash_tasks_that_do_not_depend_on_outputs_of_other_tasks(
        hasher.as_ref(),
        &env.project_graph,
        &task_graph,
        &task_env,
    )
    .await?;
    let hashing_ms = hashing_started.elapsed().as_millis() as u64;
    notify(
        &life_cycle,
        &LifecycleEvent::IntervalMeasured {
            name: "hashing".to_string(),
            millis: hashing_ms,
        },
    );

    let context = RunnerContext {
        project_graph: Arc::clone(&env.project_graph),
        workspace: Arc::clone(&env.workspace),
        task_graph: Arc::clone(&task_graph),
        run_config: Arc::clone(&run_config),
        task_env: Arc::clone(&task_env),
        fingerprints: Arc::new(fingerprints),
        hasher: ContextHasher::new(hasher, Arc::clone(&task_graph), task_env),
        life_cycle: Arc::clone(&life_cycle),
        initiating_project: match request.output_style {
            Some(OutputStyle::Compact) => None,
            _ => initiating_project.map(str::to_string),
        },
    };

    let mut runner = env.registry.construct(&resolved.module_ref, &resolved.options)?;
    let invocation = runner.invoke(tasks, resolved.options.clone(), context);

    let outcome = normalize_invocation(invocation).await;
    notify(
        &life_cycle,
        &LifecycleEvent::RunCompleted {
            results: outcome.results.clone(),
        },
    );

    Ok(exit_code(&outcome))
}

/// Standard members first (run recorder, terminal renderer), then the
/// optional observers enabled by the run configuration.
fn construct_life_cycles(
    run_config: &RunConfig,
    cache_directory: &std::path::Path,
    request: &RunRequest,
    renderer: Box<dyn LifeCycle>,
) -> SharedLifeCycle {
    let mut members: Vec<Box<dyn LifeCycle>> = Vec::new();
    members.push(Box::new(RunRecorderLifeCycle::new(
        cache_directory.join("run.json"),
        command_description(request),
    )));
    members.push(renderer);
    if run_config.perf_logging {
        members.push(Box::new(TaskTimingsLifeCycle::new()));
    }
    if let Some(path) = &run_config.profile_path {
        members.push(Box::new(TaskProfilingLifeCycle::new(path.clone())));
    }
    Arc::new(Mutex::new(CompositeLifeCycle::new(members)))
}

fn command_description(request: &RunRequest) -> String {
    let mut description = format!("run {}", request.targets.join(","));
    if !request.projects.is_empty() {
        description.push_str(" --projects=");
        description.push_str(&request.projects.join(","));
    }
    if let Some(configuration) = &request.configuration {
        description.push_str(" --configuration=");
        description.push_str(configuration);
    }
    description
}
