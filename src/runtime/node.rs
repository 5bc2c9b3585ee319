use async_trait::async_trait;
use crate::error::ExecutionError;
use crate::runtime::task::{TaskRun, TaskState};
use std::fmt::Debug;

/// What a task does once the scheduler has bound its ports to files.
///
/// The compiler picks one implementation per task: `EmitState` for state
/// tasks and `BlockProcess` for process tasks. The returned state is
/// `Succeeded`, `Skipped` or `Failed`; an `Err` aborts the whole run.
#[async_trait]
pub trait TaskBehavior: Send + Sync + Debug {
    async fn execute(&self, run: &TaskRun) -> Result<TaskState, ExecutionError>;
}
