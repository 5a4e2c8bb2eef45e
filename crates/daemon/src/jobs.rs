//! Built-in job types shipped with the daemon.

use async_trait::async_trait;
use dray_core::application::codec;
use dray_core::domain::Job;
use dray_core::port::JobRegistry;
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// Default wall-clock limit for a shell command (seconds).
const DEFAULT_SHELL_TIMEOUT_SECS: u64 = 60;

/// Runs a shell command on the worker host.
///
/// Arguments: `[command, timeout_secs]` — the timeout is optional and
/// defaults to [`DEFAULT_SHELL_TIMEOUT_SECS`]. A non-zero exit status or an
/// exceeded timeout is an execution failure, so the command participates in
/// the normal retry/failed-list arithmetic.
#[derive(Debug)]
pub struct ShellJob {
    queue: String,
    command: String,
    timeout_secs: u64,
    retries: i32,
}

impl ShellJob {
    pub const JOB_TYPE: &'static str = "shell";

    pub fn new(queue: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            command: command.into(),
            timeout_secs: DEFAULT_SHELL_TIMEOUT_SECS,
            retries: 0,
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_retries(mut self, retries: i32) -> Self {
        self.retries = retries;
        self
    }
}

#[async_trait]
impl Job for ShellJob {
    fn job_type(&self) -> &str {
        Self::JOB_TYPE
    }

    fn queue(&self) -> &str {
        &self.queue
    }

    fn arguments(&self) -> Vec<serde_json::Value> {
        vec![json!(self.command), json!(self.timeout_secs)]
    }

    fn retries(&self) -> i32 {
        self.retries
    }

    fn set_retries(&mut self, retries: i32) {
        self.retries = retries;
    }

    async fn execute(&self) -> anyhow::Result<()> {
        let mut command = tokio::process::Command::new("sh");
        command.arg("-c").arg(&self.command).kill_on_drop(true);

        let status = tokio::time::timeout(Duration::from_secs(self.timeout_secs), command.status())
            .await
            .map_err(|_| anyhow::anyhow!("command timed out after {}s", self.timeout_secs))??;

        if !status.success() {
            anyhow::bail!("command exited with {}", status);
        }
        info!(command = %self.command, "shell command finished");
        Ok(())
    }
}

/// Registry with every job type this daemon can execute.
pub fn registry() -> JobRegistry {
    let mut registry = JobRegistry::new();
    registry.register(ShellJob::JOB_TYPE, |payload| {
        Ok(Box::new(ShellJob {
            queue: payload.queue.clone(),
            command: codec::required_arg(payload, 0)?,
            timeout_secs: codec::optional_arg(payload, 1, DEFAULT_SHELL_TIMEOUT_SECS)?,
            retries: 0,
        }))
    });
    registry
}
