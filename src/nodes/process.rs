use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::dsl::NodeId;
use crate::error::ExecutionError;
use crate::runtime::node::TaskBehavior;
use crate::runtime::storage::Failure;
use crate::runtime::task::{TaskRun, TaskState};

/// Runs a node's block program.
///
/// Upstream data is optional: when any input file is absent the task is
/// skipped without running anything and without reporting a failure, and
/// since it publishes nothing its own consumers are skipped in turn. A
/// command that exits non-zero is reported as a [`Failure`] for the node.
/// Only a shell that cannot be started at all is an error.
#[derive(Debug, Clone)]
pub struct BlockProcess {
    node: NodeId,
}

impl BlockProcess {
    pub fn new(node: NodeId) -> Self {
        Self { node }
    }
}

#[async_trait]
impl TaskBehavior for BlockProcess {
    async fn execute(&self, run: &TaskRun) -> Result<TaskState, ExecutionError> {
        // 1. Skip on missing input
        let missing = run.missing_inputs().await?;
        if let Some(input) = missing.first() {
            info!(task = %run.name, input = %input, "Skipping: missing input");
            return Ok(TaskState::Skipped);
        }

        // 2. Run through the shell, stderr folded into stdout
        let command = run.render_command()?;
        debug!(task = %run.name, command = %command, "Running command");

        let output = Command::new(&run.shell)
            .arg("-c")
            .arg(format!("exec 2>&1\n{}", command))
            .current_dir(&run.scratch)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExecutionError::Spawn {
                task: run.name.clone(),
                source,
            })?;

        let captured = String::from_utf8_lossy(&output.stdout).into_owned();

        // 3. Report non-zero exits
        if output.status.success() {
            debug!(task = %run.name, "Command succeeded");
            Ok(TaskState::Succeeded)
        } else {
            error!(task = %run.name, status = %output.status, output = %captured, "Command failed");
            run.failures.emit(Failure::new(self.node.clone(), captured));
            Ok(TaskState::Failed)
        }
    }
}
