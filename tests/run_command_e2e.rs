// tests/run_command_e2e.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use rundag::config::model::{DependencyRules, RunRequest, WorkspaceConfig};
use rundag::project::ProjectGraph;
use rundag::run_command::{ExtraOptions, RunEnvironment, run_command};
use rundag::runner::{DEFAULT_RUNNER_ID, RunnerEvent, RunnerRegistry, TasksRunner};
use rundag::types::TaskStatus;
use rundag_test_utils::builders::{
    ProjectGraphBuilder, ProjectNodeBuilder, TargetConfigBuilder, WorkspaceConfigBuilder,
    run_request,
};
use rundag_test_utils::fake_accelerator::FakeAccelerator;
use rundag_test_utils::fake_runner::{FakeCompletedRunner, FakeStreamingRunner};
use rundag_test_utils::{init_tracing, with_timeout};

fn environment(
    projects: ProjectGraph,
    workspace: WorkspaceConfig,
    registry: RunnerRegistry,
) -> RunEnvironment {
    RunEnvironment {
        project_graph: Arc::new(projects),
        workspace: Arc::new(workspace),
        workspace_root: PathBuf::from("."),
        file_map: BTreeMap::new(),
        accelerator: None,
        registry,
        task_env: BTreeMap::new(),
    }
}

fn registry_with(factory: impl Fn() -> Box<dyn TasksRunner> + Send + Sync + 'static) -> RunnerRegistry {
    let mut registry = RunnerRegistry::new();
    registry.register(DEFAULT_RUNNER_ID, move |_options| Ok(factory()));
    registry
}

fn app_lib_projects(app_cmd: &str, lib_cmd: &str) -> ProjectGraph {
    ProjectGraphBuilder::new()
        .with_project(
            ProjectNodeBuilder::new("lib")
                .with_target("build", TargetConfigBuilder::new().command(lib_cmd).build())
                .build(),
        )
        .with_project(
            ProjectNodeBuilder::new("app")
                .with_target("build", TargetConfigBuilder::new().command(app_cmd).build())
                .build(),
        )
        .with_dependency("app", "lib")
        .build()
}

async fn run(env: &RunEnvironment, request: &RunRequest) -> i32 {
    with_timeout(run_command(
        env,
        request,
        &BTreeMap::new(),
        None,
        &DependencyRules::default(),
        ExtraOptions::default(),
    ))
    .await
}

fn cache_workspace() -> (tempfile::TempDir, WorkspaceConfig) {
    let dir = tempfile::tempdir().unwrap();
    let workspace = WorkspaceConfigBuilder::new()
        .cache_directory(dir.path().to_str().unwrap())
        .build();
    (dir, workspace)
}

#[tokio::test]
async fn fake_backend_success_yields_exit_code_zero() {
    init_tracing();
    let (_cache, workspace) = cache_workspace();
    let registry = registry_with(|| Box::new(FakeCompletedRunner::new(BTreeMap::new())));
    let env = environment(app_lib_projects("true", "true"), workspace, registry);

    let code = run(&env, &run_request(&["build"], &["app"])).await;
    assert_eq!(code, 0);
}

#[tokio::test]
async fn fake_backend_failure_yields_exit_code_one() {
    init_tracing();
    let (_cache, workspace) = cache_workspace();
    let registry = registry_with(|| {
        let mut statuses = BTreeMap::new();
        statuses.insert("app:build".to_string(), TaskStatus::Failure);
        Box::new(FakeCompletedRunner::new(statuses))
    });
    let env = environment(app_lib_projects("true", "true"), workspace, registry);

    let code = run(&env, &run_request(&["build"], &["app"])).await;
    assert_eq!(code, 1);
}

#[tokio::test]
async fn streaming_backend_error_event_fails_the_run() {
    init_tracing();
    let (_cache, workspace) = cache_workspace();
    let registry = registry_with(|| {
        Box::new(FakeStreamingRunner::new(vec![
            RunnerEvent::TaskCompleted {
                task_id: "app:build".to_string(),
                status: TaskStatus::Success,
                success: true,
            },
            RunnerEvent::Error("stream broke".to_string()),
        ]))
    });
    let env = environment(app_lib_projects("true", "true"), workspace, registry);

    let code = run(&env, &run_request(&["build"], &["app"])).await;
    assert_eq!(code, 1);
}

#[tokio::test]
async fn streaming_backend_success_events_yield_exit_code_zero() {
    init_tracing();
    let (_cache, workspace) = cache_workspace();
    let registry = registry_with(|| {
        Box::new(FakeStreamingRunner::new(vec![RunnerEvent::TaskCompleted {
            task_id: "app:build".to_string(),
            status: TaskStatus::Success,
            success: true,
        }]))
    });
    let env = environment(app_lib_projects("true", "true"), workspace, registry);

    let code = run(&env, &run_request(&["build"], &["app"])).await;
    assert_eq!(code, 0);
}

#[tokio::test]
async fn cycle_without_override_aborts_with_exit_code_one() {
    init_tracing();
    let (_cache, mut workspace) = cache_workspace();
    let projects = ProjectGraphBuilder::new()
        .with_project(
            ProjectNodeBuilder::new("app")
                .with_target("build", TargetConfigBuilder::new().command("true").build())
                .with_target("prebuild", TargetConfigBuilder::new().command("true").build())
                .build(),
        )
        .build();
    workspace = WorkspaceConfigBuilder::new()
        .cache_directory(workspace.cache_directory.as_ref().unwrap().to_str().unwrap())
        .with_depends_on("build", &["prebuild"])
        .with_depends_on("prebuild", &["build"])
        .build();

    let invoked = Arc::new(std::sync::Mutex::new(Vec::new()));
    let invoked_handle = Arc::clone(&invoked);
    let mut registry = RunnerRegistry::new();
    registry.register(DEFAULT_RUNNER_ID, move |_options| {
        let runner = FakeCompletedRunner::new(BTreeMap::new());
        {
            let mut guard = invoked_handle.lock().unwrap();
            guard.push(runner.invoked());
        }
        Ok(Box::new(runner))
    });

    let env = environment(projects, workspace, registry);
    let code = run(&env, &run_request(&["build"], &["app"])).await;

    assert_eq!(code, 1);
    // The backend was never constructed: the run aborted before dispatch.
    assert!(invoked.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cycle_with_ignore_cycles_is_broken_and_the_run_proceeds() {
    init_tracing();
    let (_cache, workspace) = cache_workspace();
    let projects = ProjectGraphBuilder::new()
        .with_project(
            ProjectNodeBuilder::new("app")
                .with_target("build", TargetConfigBuilder::new().command("true").build())
                .with_target("prebuild", TargetConfigBuilder::new().command("true").build())
                .build(),
        )
        .build();
    let workspace = WorkspaceConfigBuilder::new()
        .cache_directory(workspace.cache_directory.as_ref().unwrap().to_str().unwrap())
        .with_depends_on("build", &["prebuild"])
        .with_depends_on("prebuild", &["build"])
        .build();
    let registry = registry_with(|| Box::new(FakeCompletedRunner::new(BTreeMap::new())));
    let env = environment(projects, workspace, registry);

    let mut request = run_request(&["build"], &["app"]);
    request.ignore_cycles = true;

    let code = run(&env, &request).await;
    assert_eq!(code, 0);
}

#[tokio::test]
async fn local_backend_runs_real_commands() {
    init_tracing();
    let (_cache, workspace) = cache_workspace();
    let env = environment(
        app_lib_projects("true", "true"),
        workspace,
        RunnerRegistry::with_builtins(None),
    );

    let code = run(&env, &run_request(&["build"], &["app"])).await;
    assert_eq!(code, 0);
}

#[tokio::test]
async fn local_backend_failure_skips_dependents_and_fails_the_run() {
    init_tracing();
    let (_cache, workspace) = cache_workspace();
    let workspace = WorkspaceConfigBuilder::new()
        .cache_directory(workspace.cache_directory.as_ref().unwrap().to_str().unwrap())
        .with_depends_on("build", &["^build"])
        .build();
    let env = environment(
        app_lib_projects("true", "false"),
        workspace,
        RunnerRegistry::with_builtins(None),
    );

    let code = run(&env, &run_request(&["build"], &["app"])).await;
    assert_eq!(code, 1);
}

#[tokio::test]
async fn empty_project_selection_runs_every_defining_project() {
    init_tracing();
    let (_cache, workspace) = cache_workspace();
    // `lib:build` fails, so a non-zero exit proves the defaulted selection
    // actually dispatched tasks instead of running an empty graph.
    let env = environment(
        app_lib_projects("true", "false"),
        workspace,
        RunnerRegistry::with_builtins(None),
    );

    let code = run(&env, &run_request(&["build"], &[])).await;
    assert_eq!(code, 1);
}

#[tokio::test]
async fn cache_eligible_task_is_cached_on_the_second_run() {
    init_tracing();
    let (_cache, workspace) = cache_workspace();
    let projects = ProjectGraphBuilder::new()
        .with_project(
            ProjectNodeBuilder::new("app")
                .with_target(
                    "build",
                    TargetConfigBuilder::new().command("true").cache(true).build(),
                )
                .build(),
        )
        .build();
    let env = environment(projects, workspace, RunnerRegistry::with_builtins(None));
    let request = run_request(&["build"], &["app"]);

    assert_eq!(run(&env, &request).await, 0);
    // Second run resolves from the fingerprint-keyed cache; still clean.
    assert_eq!(run(&env, &request).await, 0);
}

#[tokio::test]
async fn remote_backend_receives_the_manifest_and_drives_the_run() {
    init_tracing();
    let (_cache, workspace) = cache_workspace();
    let workspace = WorkspaceConfigBuilder::new()
        .cache_directory(workspace.cache_directory.as_ref().unwrap().to_str().unwrap())
        .accelerator_access_token("secret")
        .build();

    let client = Arc::new(FakeAccelerator::new(
        true,
        vec![RunnerEvent::TaskCompleted {
            task_id: "app:build".to_string(),
            status: TaskStatus::Success,
            success: true,
        }],
    ));
    let manifests = client.manifests();

    let mut env = environment(
        app_lib_projects("true", "true"),
        workspace,
        RunnerRegistry::with_builtins(Some(Arc::clone(&client) as _)),
    );
    env.accelerator = Some(client);

    let code = run(&env, &run_request(&["build"], &["app"])).await;
    assert_eq!(code, 0);

    let guard = manifests.lock().unwrap();
    assert_eq!(guard.len(), 1);
    assert_eq!(guard[0].access_token.as_deref(), Some("secret"));
    assert!(guard[0].fingerprints.contains_key("app:build"));
}
