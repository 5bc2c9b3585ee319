use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::compiler::Mode;
use crate::compiler::core::Compiler;
use crate::config::RuntimeConfig;
use crate::dsl::Graph;
use crate::error::{ExecutionError, WorkflowError};
use crate::runtime::context::RunContext;
use crate::runtime::engine::{Engine, Scheduler};
use crate::runtime::storage::{self, FailureMap};
use crate::runtime::task::TaskState;

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: Mode,
    /// Nodes whose block program exited non-zero. Nodes that succeeded or
    /// were skipped are absent.
    pub failures: FailureMap,
    /// Final state of every task, by task name.
    pub tasks: BTreeMap<String, TaskState>,
}

impl RunReport {
    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.tasks
            .iter()
            .filter(|(_, state)| **state == TaskState::Skipped)
            .map(|(name, _)| name.as_str())
    }
}

/// Compiles graphs and runs them on a [`Scheduler`].
pub struct Workflow<S = Engine> {
    config: RuntimeConfig,
    scheduler: S,
}

impl Workflow<Engine> {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            scheduler: Engine::new(),
        }
    }
}

impl<S: Scheduler> Workflow<S> {
    pub fn with_scheduler(config: RuntimeConfig, scheduler: S) -> Self {
        Self { config, scheduler }
    }

    /// Schema-only run. Returns the failed nodes and their captured output.
    pub async fn validate(&self, graph: &Graph, output_directory: &Path) -> Result<FailureMap, WorkflowError> {
        Ok(self.run(Mode::Validate, graph, output_directory).await?.failures)
    }

    /// Schema and instance run. Returns the failed nodes and their captured output.
    pub async fn evaluate(&self, graph: &Graph, output_directory: &Path) -> Result<FailureMap, WorkflowError> {
        Ok(self.run(Mode::Evaluate, graph, output_directory).await?.failures)
    }

    /// Compiles `graph` for `mode` and runs it, writing state, schema and
    /// instance files under `output_directory`. The directory is created if
    /// needed and is never removed.
    pub async fn run(&self, mode: Mode, graph: &Graph, output_directory: &Path) -> Result<RunReport, WorkflowError> {
        let run_id = Uuid::new_v4();
        info!(
            run_id = %run_id,
            mode = %mode,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "Preparing run"
        );

        let output_directory = absolute(output_directory)?;
        let task_graph = Compiler::new(&self.config).compile(graph, mode, &output_directory)?;

        tokio::fs::create_dir_all(&output_directory)
            .await
            .map_err(|source| ExecutionError::Setup {
                path: output_directory.clone(),
                source,
            })?;

        let (sink, collector) = storage::channel();
        let context = RunContext::new(run_id, output_directory.join(".scratch"), &self.config.shell, sink);
        let states = context.states();

        // The context owns the last sink; it is gone once the scheduler returns.
        self.scheduler.run(task_graph, context).await?;
        let failures = collector.finish().await?;

        if !failures.is_empty() {
            warn!(run_id = %run_id, failed = failures.len(), "Run finished with failures");
        }
        info!(run_id = %run_id, mode = %mode, "Run complete");

        Ok(RunReport {
            run_id,
            mode,
            failures,
            tasks: states.snapshot(),
        })
    }
}

fn absolute(path: &Path) -> Result<PathBuf, ExecutionError> {
    std::path::absolute(path).map_err(|source| ExecutionError::Setup {
        path: path.to_path_buf(),
        source,
    })
}
