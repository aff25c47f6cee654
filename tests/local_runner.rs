// tests/local_runner.rs

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use rundag::config::model::DependencyRules;
use rundag::config::run_config::RunConfig;
use rundag::errors::Result;
use rundag::graph::create_task_graph;
use rundag::hasher::InProcessTaskHasher;
use rundag::lifecycle::{CompositeLifeCycle, LifeCycle, LifecycleEvent, SharedLifeCycle};
use rundag::project::ProjectGraph;
use rundag::runner::{
    ContextHasher, LocalTasksRunner, RunnerContext, RunnerInvocation, RunnerOptions, TasksRunner,
};
use rundag::types::{TaskId, TaskStatus};
use rundag_test_utils::builders::{
    ProjectGraphBuilder, ProjectNodeBuilder, TargetConfigBuilder, WorkspaceConfigBuilder,
};
use rundag_test_utils::{init_tracing, with_timeout};

/// Panics once, while the named task's start is being delivered.
struct PanicOnTaskStarted {
    target: TaskId,
    fired: bool,
}

impl LifeCycle for PanicOnTaskStarted {
    fn on_event(&mut self, event: &LifecycleEvent) -> Result<()> {
        if let LifecycleEvent::TaskStarted { task_id } = event {
            if *task_id == self.target && !self.fired {
                self.fired = true;
                panic!("observer crashed while handling {task_id}");
            }
        }
        Ok(())
    }
}

/// Records completion statuses as they are delivered.
struct StatusRecorder {
    completed: Arc<Mutex<BTreeMap<TaskId, TaskStatus>>>,
}

impl LifeCycle for StatusRecorder {
    fn on_event(&mut self, event: &LifecycleEvent) -> Result<()> {
        if let LifecycleEvent::TaskCompleted { task_id, status, .. } = event {
            let mut guard = match self.completed.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.insert(task_id.clone(), *status);
        }
        Ok(())
    }
}

fn independent_projects() -> ProjectGraph {
    ProjectGraphBuilder::new()
        .with_project(
            ProjectNodeBuilder::new("app")
                .with_target("build", TargetConfigBuilder::new().command("true").build())
                .build(),
        )
        .with_project(
            ProjectNodeBuilder::new("lib")
                .with_target("build", TargetConfigBuilder::new().command("true").build())
                .build(),
        )
        .build()
}

fn context_for(projects: ProjectGraph, life_cycle: SharedLifeCycle) -> RunnerContext {
    let graph = create_task_graph(
        &projects,
        &DependencyRules::new(),
        &["app".to_string(), "lib".to_string()],
        &["build".to_string()],
        None,
        &BTreeMap::new(),
        false,
    )
    .unwrap();

    let projects = Arc::new(projects);
    let task_graph = Arc::new(graph);
    let task_env = Arc::new(BTreeMap::new());
    let hasher = Arc::new(InProcessTaskHasher::new(BTreeMap::new(), Arc::clone(&projects)));

    RunnerContext {
        project_graph: projects,
        workspace: Arc::new(WorkspaceConfigBuilder::new().build()),
        task_graph: Arc::clone(&task_graph),
        run_config: Arc::new(RunConfig::default()),
        task_env: Arc::clone(&task_env),
        fingerprints: Arc::new(BTreeMap::new()),
        hasher: ContextHasher::new(hasher, task_graph, task_env),
        life_cycle,
        initiating_project: None,
    }
}

#[tokio::test]
async fn panicking_observer_marks_the_task_failed_instead_of_losing_it() {
    init_tracing();
    let completed = Arc::new(Mutex::new(BTreeMap::new()));
    let life_cycle: SharedLifeCycle = Arc::new(Mutex::new(CompositeLifeCycle::new(vec![
        Box::new(PanicOnTaskStarted {
            target: "app:build".to_string(),
            fired: false,
        }),
        Box::new(StatusRecorder {
            completed: Arc::clone(&completed),
        }),
    ])));

    let context = context_for(independent_projects(), life_cycle);
    let tasks = context.task_graph.tasks.values().cloned().collect();

    let mut runner = LocalTasksRunner::new();
    let invocation = runner.invoke(tasks, RunnerOptions::default(), context);
    let RunnerInvocation::Completed(future) = invocation else {
        panic!("the local backend returns the completed shape");
    };

    let statuses = with_timeout(future).await.unwrap();
    // The worker died mid-notification; the task must still surface as a
    // failure rather than silently vanishing from the results.
    assert_eq!(statuses.get("app:build"), Some(&TaskStatus::Failure));
    assert_eq!(statuses.get("lib:build"), Some(&TaskStatus::Success));

    let guard = completed.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    assert_eq!(guard.get("app:build"), Some(&TaskStatus::Failure));
}
