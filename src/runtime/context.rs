use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::runtime::storage::FailureSink;
use crate::runtime::task::TaskState;

/// Per-run state shared by the scheduler and every task it spawns.
#[derive(Debug, Clone)] // cheap to clone: just Arcs and small strings
pub struct RunContext {
    pub run_id: Uuid,
    /// Parent of the per-task scratch directories.
    pub scratch_root: PathBuf,
    pub shell: String,
    pub failures: FailureSink,
    states: Arc<DashMap<String, TaskState>>,
}

impl RunContext {
    pub fn new(run_id: Uuid, scratch_root: PathBuf, shell: &str, failures: FailureSink) -> Self {
        Self {
            run_id,
            scratch_root,
            shell: shell.to_string(),
            failures,
            states: Arc::new(DashMap::new()),
        }
    }

    pub fn set_state(&self, task: &str, state: TaskState) {
        self.states.insert(task.to_string(), state);
    }

    /// Handle on the state table that outlives the context. Holding it does
    /// not keep the failure channel open.
    pub fn states(&self) -> TaskStates {
        TaskStates(self.states.clone())
    }
}

#[derive(Debug, Clone)]
pub struct TaskStates(Arc<DashMap<String, TaskState>>);

impl TaskStates {
    pub fn snapshot(&self) -> BTreeMap<String, TaskState> {
        self.0
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}
