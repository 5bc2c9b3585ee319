use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ExecutionError;
use crate::runtime::node::TaskBehavior;
use crate::runtime::task::{TaskRun, TaskState};

/// Writes a node's stored state, byte for byte, to every output of the task.
#[derive(Debug, Clone)]
pub struct EmitState {
    content: Arc<str>,
}

impl EmitState {
    pub fn new(content: &str) -> Self {
        Self {
            content: Arc::from(content),
        }
    }
}

#[async_trait]
impl TaskBehavior for EmitState {
    async fn execute(&self, run: &TaskRun) -> Result<TaskState, ExecutionError> {
        for path in run.outputs.values() {
            tokio::fs::write(path, self.content.as_bytes())
                .await
                .map_err(|source| ExecutionError::Io {
                    task: run.name.clone(),
                    source,
                })?;
        }
        Ok(TaskState::Succeeded)
    }
}
