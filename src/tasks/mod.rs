//! Background housekeeping tasks
//!
//! Tasks run on the tokio runtime next to the active command. The command
//! never waits on them for long: [`TaskHandle::finish`] gives them a short
//! window to complete and cancels them otherwise.

pub mod update_check;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use update_check::{CratesIoSource, UpdateCheckTask, UpdateState, VersionSource};

/// A unit of background work
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    /// Task name used in logs
    fn name(&self) -> &str;

    /// Run the task; implementations should return promptly once `cancel` fires
    async fn run(&self, cancel: CancellationToken) -> Result<()>;
}

type PreHook = Box<dyn FnOnce() + Send>;

/// Collects tasks and runs them in the background
#[derive(Default)]
pub struct TaskRunner {
    tasks: Vec<Box<dyn ScheduledTask>>,
    pre_hooks: Vec<PreHook>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(mut self, task: impl ScheduledTask + 'static) -> Self {
        self.tasks.push(Box::new(task));
        self
    }

    /// Run `hook` in the background before any task starts
    pub fn with_pre_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.pre_hooks.push(Box::new(hook));
        self
    }

    /// Start running on the current tokio runtime
    ///
    /// Must be called from within a runtime context.
    pub fn spawn(self) -> TaskHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let join = tokio::spawn(async move {
            for hook in self.pre_hooks {
                hook();
            }

            for task in &self.tasks {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!(task = task.name(), "task runner cancelled");
                        return;
                    }
                    result = task.run(token.clone()) => {
                        if let Err(e) = result {
                            tracing::debug!(task = task.name(), "task failed: {:#}", e);
                        }
                    }
                }
            }
        });

        TaskHandle { cancel, join }
    }
}

/// How the background work ended from the caller's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    /// Did not complete within the wait window and was cancelled
    Cancelled,
}

/// Handle to a spawned [`TaskRunner`]
pub struct TaskHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Wait up to `timeout` for completion, cancelling the tasks otherwise
    ///
    /// Never blocks longer than `timeout`; a cancelled runner is left to wind
    /// down on its own.
    pub async fn finish(self, timeout: Duration) -> TaskOutcome {
        match tokio::time::timeout(timeout, self.join).await {
            Ok(Ok(())) => TaskOutcome::Completed,
            Ok(Err(e)) => {
                tracing::debug!("task runner stopped abnormally: {}", e);
                TaskOutcome::Completed
            }
            Err(_) => {
                tracing::debug!("tasks did not finish within {:?} - cancelling", timeout);
                self.cancel.cancel();
                TaskOutcome::Cancelled
            }
        }
    }
}
