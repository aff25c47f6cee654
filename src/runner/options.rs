// src/runner/options.rs

//! Runner option merging.

use std::path::PathBuf;

use crate::config::model::{RunRequest, RunnerConfiguredOptions, WorkspaceConfig};
use crate::types::TargetName;

/// Parallelism used when neither the request, the runner configuration nor
/// the workspace sets one.
pub const DEFAULT_PARALLEL: usize = 3;

/// Cache directory used when none is configured.
pub const DEFAULT_CACHE_DIRECTORY: &str = ".rundag/cache";

/// Merged per-run backend options. Built once per run; read-only afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerOptions {
    pub parallel: usize,
    pub cache_directory: PathBuf,
    /// Target names eligible for caching: workspace cacheable defaults
    /// concatenated with any runner-supplied list.
    pub cacheable_operations: Vec<TargetName>,
    pub use_daemon_process: bool,
    pub access_token: Option<String>,
    pub url: Option<String>,
    pub encryption_key: Option<String>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            parallel: DEFAULT_PARALLEL,
            cache_directory: PathBuf::from(DEFAULT_CACHE_DIRECTORY),
            cacheable_operations: Vec::new(),
            use_daemon_process: true,
            access_token: None,
            url: None,
            encryption_key: None,
        }
    }
}

/// Merge runner options for the named runner.
///
/// Precedence: explicit request flags > runner-configured options >
/// workspace defaults. Accelerator credentials are filled only if unset, and
/// only when the resolved backend is the accelerator-aware one.
pub fn resolve_runner_options(
    runner: &str,
    workspace: &WorkspaceConfig,
    request: &RunRequest,
    is_accelerator_default: bool,
) -> RunnerOptions {
    let configured = workspace
        .runners
        .get(runner)
        .map(|definition| definition.options.clone())
        .unwrap_or_else(RunnerConfiguredOptions::default);

    let mut parallel = request.parallel.or(configured.parallel);
    parallel = parallel.or(workspace.parallel);

    let mut cache_directory = configured.cache_directory.clone();
    if cache_directory.is_none() {
        cache_directory = workspace.cache_directory.clone();
    }

    let mut cacheable_operations = configured.cacheable_operations.clone();
    cacheable_operations.extend(workspace.default_cacheable_operations());

    let mut access_token = configured.access_token.clone();
    let mut url = configured.url.clone();
    let mut encryption_key = configured.encryption_key.clone();
    if is_accelerator_default {
        if access_token.is_none() {
            access_token = workspace.accelerator.access_token.clone();
        }
        if url.is_none() {
            url = workspace.accelerator.url.clone();
        }
        if encryption_key.is_none() {
            encryption_key = workspace.accelerator.encryption_key.clone();
        }
    }

    let use_daemon_process = configured
        .use_daemon_process
        .or(workspace.use_daemon_process)
        .unwrap_or(true);

    RunnerOptions {
        parallel: parallel.unwrap_or(DEFAULT_PARALLEL),
        cache_directory: cache_directory.unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIRECTORY)),
        cacheable_operations,
        use_daemon_process,
        access_token,
        url,
        encryption_key,
    }
}
