// src/main.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rundag::config::loader;
use rundag::config::model::DependencyRules;
use rundag::file_map::build_project_file_map;
use rundag::run_command::{ExtraOptions, RunEnvironment, run_command};
use rundag::runner::RunnerRegistry;
use rundag::{cli, logging};

#[tokio::main]
async fn main() {
    let code = match run_main().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("rundag error: {err:?}");
            1
        }
    };
    std::process::exit(code);
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;

    let config_path = PathBuf::from(&args.config);
    let workspace_root = config_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let file = loader::load_and_validate(&config_path)?;
    let file_map = build_project_file_map(&workspace_root, &file.project_graph)?;

    let request = args.to_run_request();
    let overrides = parse_overrides(&args.overrides);

    let env = RunEnvironment {
        project_graph: Arc::new(file.project_graph),
        workspace: Arc::new(file.workspace),
        workspace_root,
        file_map,
        accelerator: None,
        registry: RunnerRegistry::with_builtins(None),
        task_env: std::env::vars().collect(),
    };

    let code = run_command(
        &env,
        &request,
        &overrides,
        None,
        &DependencyRules::default(),
        ExtraOptions {
            exclude_task_dependencies: args.exclude_task_dependencies,
            load_dot_env_files: false,
        },
    )
    .await;

    Ok(code)
}

/// Parse `key=value` pairs forwarded after `--`. Entries without `=` are
/// treated as boolean flags set to `"true"`.
fn parse_overrides(raw: &[String]) -> BTreeMap<String, String> {
    raw.iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (entry.clone(), "true".to_string()),
        })
        .collect()
}
