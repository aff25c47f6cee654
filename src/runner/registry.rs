// src/runner/registry.rs

//! Runner name → backend resolution.
//!
//! Runner module references are resolved to constructors through an explicit
//! registry populated at startup, rather than loading code at run time. An
//! unknown reference fails closed with a configuration error.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::accelerator::AcceleratorClient;
use crate::config::model::{RunRequest, WorkspaceConfig};
use crate::errors::{Result, RundagError};
use crate::runner::options::{RunnerOptions, resolve_runner_options};
use crate::runner::{LocalTasksRunner, RemoteTasksRunner, TasksRunner};

/// Module reference of the built-in local parallel backend.
pub const DEFAULT_RUNNER_ID: &str = "rundag:local";

/// Module reference of the built-in remote-accelerator-aware backend.
pub const REMOTE_RUNNER_ID: &str = "rundag:remote";

/// Constructor for a backend instance.
pub type RunnerFactory = Box<dyn Fn(&RunnerOptions) -> Result<Box<dyn TasksRunner>> + Send + Sync>;

/// Registry mapping runner module references to constructors.
pub struct RunnerRegistry {
    factories: BTreeMap<String, RunnerFactory>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in backends. The remote backend is only
    /// registered when an accelerator client is available.
    pub fn with_builtins(accelerator: Option<Arc<dyn AcceleratorClient>>) -> Self {
        let mut registry = Self::new();
        registry.register(DEFAULT_RUNNER_ID, |_options| {
            Ok(Box::new(LocalTasksRunner::new()) as Box<dyn TasksRunner>)
        });
        if let Some(client) = accelerator {
            registry.register(REMOTE_RUNNER_ID, move |_options| {
                Ok(Box::new(RemoteTasksRunner::new(Arc::clone(&client))) as Box<dyn TasksRunner>)
            });
        }
        registry
    }

    pub fn register(
        &mut self,
        module_ref: impl Into<String>,
        factory: impl Fn(&RunnerOptions) -> Result<Box<dyn TasksRunner>> + Send + Sync + 'static,
    ) {
        self.factories.insert(module_ref.into(), Box::new(factory));
    }

    /// Construct the backend for a module reference. Fails closed on an
    /// unknown reference.
    pub fn construct(
        &self,
        module_ref: &str,
        options: &RunnerOptions,
    ) -> Result<Box<dyn TasksRunner>> {
        let factory = self.factories.get(module_ref).ok_or_else(|| {
            RundagError::ConfigError(format!("no runner registered for module '{module_ref}'"))
        })?;
        factory(options)
    }
}

impl Default for RunnerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of runner resolution: the module reference to construct and the
/// merged options for the run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRunner {
    pub name: String,
    pub module_ref: String,
    pub options: RunnerOptions,
}

/// Resolve which execution backend a run uses and merge its options.
///
/// The runner name is `default` unless the request overrides it; a named
/// non-default runner must have a matching configuration. The module
/// reference is the configured one (relative paths resolved against the
/// workspace root), falling back to the built-in remote backend when
/// accelerator credentials are present, else the built-in local backend.
pub fn get_runner(
    request: &RunRequest,
    workspace: &WorkspaceConfig,
    workspace_root: &Path,
) -> Result<ResolvedRunner> {
    let name = request.runner.as_deref().unwrap_or("default");

    if name != "default" && !workspace.runners.contains_key(name) {
        return Err(RundagError::ConfigError(format!(
            "could not find runner configuration for '{name}'"
        )));
    }

    let module_ref = runner_module_ref(name, workspace, workspace_root);
    let is_accelerator_default = module_ref == REMOTE_RUNNER_ID;
    let options = resolve_runner_options(name, workspace, request, is_accelerator_default);

    debug!(runner = name, module = %module_ref, "runner resolved");
    Ok(ResolvedRunner {
        name: name.to_string(),
        module_ref,
        options,
    })
}

fn runner_module_ref(name: &str, workspace: &WorkspaceConfig, workspace_root: &Path) -> String {
    let definition = workspace.runners.get(name);

    if let Some(module) = definition.and_then(|d| d.runner.clone()) {
        if is_relative_path(&module) {
            return workspace_root.join(module).to_string_lossy().into_owned();
        }
        return module;
    }

    let has_accelerator_token = workspace.accelerator.access_token.is_some()
        || definition
            .map(|d| d.options.access_token.is_some())
            .unwrap_or(false);

    if has_accelerator_token {
        REMOTE_RUNNER_ID.to_string()
    } else {
        DEFAULT_RUNNER_ID.to_string()
    }
}

fn is_relative_path(module: &str) -> bool {
    module.starts_with("./") || module.starts_with("../")
}
