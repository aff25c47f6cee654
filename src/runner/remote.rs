// src/runner/remote.rs

//! Built-in remote-accelerator-aware backend.
//!
//! Hands the whole run to the accelerator service and surfaces its
//! completion notifications as the streaming result shape. The service
//! itself (and its wire format) is an external collaborator behind
//! [`AcceleratorClient`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::accelerator::{AcceleratorClient, RemoteRunManifest};
use crate::graph::task::Task;
use crate::runner::context::RunnerContext;
use crate::runner::options::RunnerOptions;
use crate::runner::{RunnerEvent, RunnerInvocation, TasksRunner};

pub struct RemoteTasksRunner {
    client: Arc<dyn AcceleratorClient>,
}

impl RemoteTasksRunner {
    pub fn new(client: Arc<dyn AcceleratorClient>) -> Self {
        Self { client }
    }
}

impl TasksRunner for RemoteTasksRunner {
    fn invoke(
        &mut self,
        tasks: Vec<Task>,
        options: RunnerOptions,
        context: RunnerContext,
    ) -> RunnerInvocation {
        let manifest = RemoteRunManifest {
            tasks,
            fingerprints: context.fingerprints.as_ref().clone(),
            parallel: options.parallel,
            access_token: options.access_token.clone(),
            url: options.url.clone(),
            encryption_key: options.encryption_key.clone(),
        };
        debug!(
            tasks = manifest.tasks.len(),
            fingerprints = manifest.fingerprints.len(),
            "submitting run to accelerator"
        );

        match self.client.execute(manifest) {
            Ok(events) => RunnerInvocation::Streaming(events),
            Err(err) => {
                error!(error = %err, "accelerator rejected the run");
                // Surface the failure through the streaming shape so the
                // aggregation path stays uniform.
                let (tx, rx) = mpsc::channel(2);
                let _ = tx.try_send(RunnerEvent::Error(err.to_string()));
                let _ = tx.try_send(RunnerEvent::Done);
                RunnerInvocation::Streaming(rx)
            }
        }
    }
}
