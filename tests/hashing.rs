// tests/hashing.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use rundag::config::model::DependencyRules;
use rundag::graph::{TaskGraph, create_task_graph};
use rundag::hasher::{
    DaemonTaskHasher, InProcessTaskHasher, TaskEnv, TaskHasher,
    hash_tasks_that_do_not_depend_on_outputs_of_other_tasks,
};
use rundag::project::{ProjectFileMap, ProjectGraph};
use rundag::runner::ContextHasher;
use rundag_test_utils::builders::{
    ProjectGraphBuilder, ProjectNodeBuilder, TargetConfigBuilder, file_map,
};
use rundag_test_utils::fake_accelerator::FakeAccelerator;
use rundag_test_utils::{init_tracing, with_timeout};

fn build_graph(projects: &ProjectGraph, rules: &DependencyRules, project: &str) -> TaskGraph {
    create_task_graph(
        projects,
        rules,
        &[project.to_string()],
        &["build".to_string()],
        None,
        &BTreeMap::new(),
        false,
    )
    .unwrap()
}

fn dep_build_rules() -> DependencyRules {
    let mut rules = DependencyRules::new();
    rules.insert(
        "build".to_string(),
        vec![rundag::config::model::DependencyRule::DependencyProjects {
            target: "build".to_string(),
        }],
    );
    rules
}

async fn fingerprint(
    hasher: &InProcessTaskHasher,
    graph: &TaskGraph,
    env: &TaskEnv,
    id: &str,
) -> String {
    hasher
        .hash_task(graph.task(id).unwrap(), graph, env)
        .await
        .unwrap()
        .to_string()
}

fn single_project() -> ProjectGraph {
    ProjectGraphBuilder::new()
        .with_project(
            ProjectNodeBuilder::new("app")
                .with_target("build", TargetConfigBuilder::new().command("make").build())
                .build(),
        )
        .build()
}

#[tokio::test]
async fn equal_inputs_yield_equal_fingerprints() {
    init_tracing();
    let projects = single_project();
    let graph = build_graph(&projects, &DependencyRules::new(), "app");
    let files = file_map(&[("app", &[("src/main.rs", "abc123")])]);
    let env = TaskEnv::new();

    let a = InProcessTaskHasher::new(files.clone(), Arc::new(projects.clone()));
    let b = InProcessTaskHasher::new(files, Arc::new(projects));

    let fp_a = with_timeout(fingerprint(&a, &graph, &env, "app:build")).await;
    let fp_b = with_timeout(fingerprint(&b, &graph, &env, "app:build")).await;
    assert_eq!(fp_a, fp_b);
}

#[tokio::test]
async fn file_content_change_changes_the_fingerprint() {
    init_tracing();
    let projects = single_project();
    let graph = build_graph(&projects, &DependencyRules::new(), "app");
    let env = TaskEnv::new();

    let before = InProcessTaskHasher::new(
        file_map(&[("app", &[("src/main.rs", "abc123")])]),
        Arc::new(projects.clone()),
    );
    let after = InProcessTaskHasher::new(
        file_map(&[("app", &[("src/main.rs", "def456")])]),
        Arc::new(projects),
    );

    let fp_before = with_timeout(fingerprint(&before, &graph, &env, "app:build")).await;
    let fp_after = with_timeout(fingerprint(&after, &graph, &env, "app:build")).await;
    assert_ne!(fp_before, fp_after);
}

#[tokio::test]
async fn declared_file_inputs_filter_out_unrelated_files() {
    init_tracing();
    let projects = ProjectGraphBuilder::new()
        .with_project(
            ProjectNodeBuilder::new("app")
                .with_target(
                    "build",
                    TargetConfigBuilder::new()
                        .command("make")
                        .files_input("src/**")
                        .build(),
                )
                .build(),
        )
        .build();
    let graph = build_graph(&projects, &DependencyRules::new(), "app");
    let env = TaskEnv::new();

    let base = InProcessTaskHasher::new(
        file_map(&[("app", &[("src/main.rs", "abc"), ("docs/readme.md", "v1")])]),
        Arc::new(projects.clone()),
    );
    let docs_changed = InProcessTaskHasher::new(
        file_map(&[("app", &[("src/main.rs", "abc"), ("docs/readme.md", "v2")])]),
        Arc::new(projects),
    );

    let fp_base = with_timeout(fingerprint(&base, &graph, &env, "app:build")).await;
    let fp_docs = with_timeout(fingerprint(&docs_changed, &graph, &env, "app:build")).await;
    assert_eq!(fp_base, fp_docs);
}

#[tokio::test]
async fn declared_env_input_value_changes_the_fingerprint() {
    init_tracing();
    let projects = ProjectGraphBuilder::new()
        .with_project(
            ProjectNodeBuilder::new("app")
                .with_target(
                    "build",
                    TargetConfigBuilder::new()
                        .command("make")
                        .env_input("BUILD_MODE")
                        .build(),
                )
                .build(),
        )
        .build();
    let graph = build_graph(&projects, &DependencyRules::new(), "app");
    let hasher = InProcessTaskHasher::new(ProjectFileMap::new(), Arc::new(projects));

    let mut env_a = TaskEnv::new();
    env_a.insert("BUILD_MODE".to_string(), "debug".to_string());
    let mut env_b = TaskEnv::new();
    env_b.insert("BUILD_MODE".to_string(), "release".to_string());

    let fp_a = with_timeout(fingerprint(&hasher, &graph, &env_a, "app:build")).await;
    let fp_b = with_timeout(fingerprint(&hasher, &graph, &env_b, "app:build")).await;
    assert_ne!(fp_a, fp_b);
}

#[tokio::test]
async fn dependency_fingerprints_propagate_upward() {
    init_tracing();
    let projects = ProjectGraphBuilder::new()
        .with_project(
            ProjectNodeBuilder::new("lib")
                .with_target("build", TargetConfigBuilder::new().command("make lib").build())
                .build(),
        )
        .with_project(
            ProjectNodeBuilder::new("app")
                .with_target("build", TargetConfigBuilder::new().command("make app").build())
                .build(),
        )
        .with_dependency("app", "lib")
        .build();
    let graph = build_graph(&projects, &dep_build_rules(), "app");
    let env = TaskEnv::new();

    let before = InProcessTaskHasher::new(
        file_map(&[("lib", &[("src/lib.rs", "v1")]), ("app", &[])]),
        Arc::new(projects.clone()),
    );
    let after = InProcessTaskHasher::new(
        file_map(&[("lib", &[("src/lib.rs", "v2")]), ("app", &[])]),
        Arc::new(projects),
    );

    // Only lib's files changed, but app:build depends on lib:build.
    let fp_before = with_timeout(fingerprint(&before, &graph, &env, "app:build")).await;
    let fp_after = with_timeout(fingerprint(&after, &graph, &env, "app:build")).await;
    assert_ne!(fp_before, fp_after);
}

#[tokio::test]
async fn runtime_marker_changes_the_fingerprint() {
    init_tracing();
    let projects = single_project();
    let graph = build_graph(&projects, &DependencyRules::new(), "app");
    let env = TaskEnv::new();

    let plain = InProcessTaskHasher::new(ProjectFileMap::new(), Arc::new(projects.clone()));
    let marked = InProcessTaskHasher::new(ProjectFileMap::new(), Arc::new(projects))
        .with_runtime_marker("node", "22.1.0");

    let fp_plain = with_timeout(fingerprint(&plain, &graph, &env, "app:build")).await;
    let fp_marked = with_timeout(fingerprint(&marked, &graph, &env, "app:build")).await;
    assert_ne!(fp_plain, fp_marked);
}

#[tokio::test]
async fn eager_hashing_skips_tasks_that_need_dependency_outputs() {
    init_tracing();
    let projects = ProjectGraphBuilder::new()
        .with_project(
            ProjectNodeBuilder::new("lib")
                .with_target("build", TargetConfigBuilder::new().command("make lib").build())
                .build(),
        )
        .with_project(
            ProjectNodeBuilder::new("app")
                .with_target(
                    "build",
                    TargetConfigBuilder::new()
                        .command("make app")
                        .dependency_outputs_input()
                        .build(),
                )
                .build(),
        )
        .with_dependency("app", "lib")
        .build();
    let graph = build_graph(&projects, &dep_build_rules(), "app");
    let hasher = InProcessTaskHasher::new(ProjectFileMap::new(), Arc::new(projects.clone()));

    let fingerprints = with_timeout(hash_tasks_that_do_not_depend_on_outputs_of_other_tasks(
        &hasher,
        &projects,
        &graph,
        &TaskEnv::new(),
    ))
    .await
    .unwrap();

    assert!(fingerprints.contains_key("lib:build"));
    assert!(!fingerprints.contains_key("app:build"));
}

#[tokio::test]
async fn output_dependent_task_without_dependencies_is_still_eagerly_hashed() {
    init_tracing();
    let projects = ProjectGraphBuilder::new()
        .with_project(
            ProjectNodeBuilder::new("app")
                .with_target(
                    "build",
                    TargetConfigBuilder::new()
                        .command("make app")
                        .dependency_outputs_input()
                        .build(),
                )
                .build(),
        )
        .build();
    let graph = build_graph(&projects, &DependencyRules::new(), "app");
    let hasher = InProcessTaskHasher::new(ProjectFileMap::new(), Arc::new(projects.clone()));

    let fingerprints = with_timeout(hash_tasks_that_do_not_depend_on_outputs_of_other_tasks(
        &hasher,
        &projects,
        &graph,
        &TaskEnv::new(),
    ))
    .await
    .unwrap();

    assert!(fingerprints.contains_key("app:build"));
}

#[tokio::test]
async fn daemon_hasher_delegates_to_the_accelerator() {
    init_tracing();
    let projects = single_project();
    let graph = build_graph(&projects, &DependencyRules::new(), "app");
    let client = Arc::new(FakeAccelerator::new(true, Vec::new()));
    let hasher = DaemonTaskHasher::new(client);

    let fp = with_timeout(hasher.hash_task(
        graph.task("app:build").unwrap(),
        &graph,
        &TaskEnv::new(),
    ))
    .await
    .unwrap();

    assert_eq!(fp, FakeAccelerator::fingerprint_for("app:build"));
}

#[tokio::test]
async fn backend_facade_hashes_omitted_arguments_against_the_run_data() {
    init_tracing();
    let projects = single_project();
    let graph = Arc::new(build_graph(&projects, &DependencyRules::new(), "app"));
    let env: Arc<TaskEnv> = Arc::new(TaskEnv::new());
    let files = file_map(&[("app", &[("src/main.rs", "abc123")])]);
    let hasher: Arc<dyn TaskHasher> =
        Arc::new(InProcessTaskHasher::new(files, Arc::new(projects)));

    let facade = ContextHasher::new(hasher, Arc::clone(&graph), Arc::clone(&env));
    let task = graph.task("app:build").unwrap();

    let explicit = with_timeout(facade.hash_task(task, Some(graph.as_ref()), Some(env.as_ref())))
        .await
        .unwrap();
    let implicit = with_timeout(facade.hash_task(task, None, None)).await.unwrap();
    assert_eq!(explicit, implicit);
}
