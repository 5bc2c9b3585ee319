use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::ExecutionError;
use crate::runtime::blueprint::{Task, TaskGraph};
use crate::runtime::context::RunContext;
use crate::runtime::task::{TaskRun, TaskState};

/// Runs a task graph to completion.
///
/// Implementations must start a task only after every task producing one of
/// its inputs has finished, and must return only once no task can emit a
/// failure any more.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn run(&self, graph: TaskGraph, context: RunContext) -> Result<(), ExecutionError>;
}

/// Local scheduler: dependency counting over a bounded set of tokio tasks.
///
/// Each task gets a private scratch directory under the context's scratch
/// root. Its output ports are bound to files in that directory and moved to
/// their published paths only if the task succeeds.
#[derive(Debug, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Self
    }
}

struct Plan {
    dependents: Vec<Vec<usize>>,
    remaining: Vec<usize>,
    inputs: Vec<BTreeMap<String, Option<PathBuf>>>,
}

#[async_trait]
impl Scheduler for Engine {
    async fn run(&self, graph: TaskGraph, context: RunContext) -> Result<(), ExecutionError> {
        let Plan {
            dependents,
            mut remaining,
            mut inputs,
        } = plan(&graph)?;
        let limit = graph.max_concurrency.max(1);

        tokio::fs::create_dir_all(&context.scratch_root)
            .await
            .map_err(|source| ExecutionError::Setup {
                path: context.scratch_root.clone(),
                source,
            })?;

        info!(
            run_id = %context.run_id,
            run = %graph.name,
            tasks = graph.tasks.len(),
            max_concurrency = limit,
            "Run started"
        );

        for task in &graph.tasks {
            context.set_state(&task.name, TaskState::Pending);
        }
        let mut ready: VecDeque<usize> = (0..graph.tasks.len()).filter(|&i| remaining[i] == 0).collect();
        for &i in &ready {
            context.set_state(&graph.tasks[i].name, TaskState::Runnable);
        }

        let mut running = JoinSet::new();
        loop {
            while running.len() < limit {
                let Some(i) = ready.pop_front() else {
                    break;
                };
                let task = graph.tasks[i].clone();
                let bound = std::mem::take(&mut inputs[i]);
                let context = context.clone();
                running.spawn(async move { (i, execute_task(task, bound, context).await) });
            }

            // Dropping `running` on an early return aborts whatever is still in flight.
            let Some(joined) = running.join_next().await else {
                break;
            };
            let (i, outcome) = joined?;
            let state = match outcome {
                Ok(state) => state,
                Err(e) => {
                    error!(run_id = %context.run_id, task = %graph.tasks[i].name, error = %e, "Run aborted");
                    return Err(e);
                }
            };

            context.set_state(&graph.tasks[i].name, state);
            for &dependent in &dependents[i] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    context.set_state(&graph.tasks[dependent].name, TaskState::Runnable);
                    ready.push_back(dependent);
                }
            }
        }

        // Only succeeds when every scratch directory is gone.
        let _ = tokio::fs::remove_dir(&context.scratch_root).await;

        info!(run_id = %context.run_id, run = %graph.name, "Run finished");
        Ok(())
    }
}

/// Resolves every wired input port to its producer and checks the graph is
/// acyclic before anything starts.
fn plan(graph: &TaskGraph) -> Result<Plan, ExecutionError> {
    let index: HashMap<&str, usize> = graph
        .tasks
        .iter()
        .enumerate()
        .map(|(i, task)| (task.name.as_str(), i))
        .collect();

    let count = graph.tasks.len();
    let mut dependents = vec![Vec::new(); count];
    let mut remaining = vec![0; count];
    let mut inputs = Vec::with_capacity(count);

    for (i, task) in graph.tasks.iter().enumerate() {
        let mut producers = BTreeSet::new();
        let mut bound = BTreeMap::new();

        for (port, source) in &task.input_ports {
            let path = match source {
                None => None,
                Some(source) => {
                    let unresolved = || ExecutionError::UnresolvedPort {
                        task: task.name.clone(),
                        port: port.clone(),
                    };
                    let &producer = index.get(source.task.as_str()).ok_or_else(unresolved)?;
                    let path = graph.tasks[producer]
                        .output_ports
                        .get(&source.port)
                        .ok_or_else(unresolved)?;
                    producers.insert(producer);
                    Some(path.clone())
                }
            };
            bound.insert(port.clone(), path);
        }

        remaining[i] = producers.len();
        for producer in producers {
            dependents[producer].push(i);
        }
        inputs.push(bound);
    }

    let mut counts = remaining.clone();
    let mut queue: VecDeque<usize> = (0..count).filter(|&i| counts[i] == 0).collect();
    let mut visited = 0;
    while let Some(i) = queue.pop_front() {
        visited += 1;
        for &dependent in &dependents[i] {
            counts[dependent] -= 1;
            if counts[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }
    if visited < count {
        let tasks = (0..count)
            .filter(|&i| counts[i] > 0)
            .map(|i| graph.tasks[i].name.clone())
            .collect();
        return Err(ExecutionError::Cycle { tasks });
    }

    Ok(Plan {
        dependents,
        remaining,
        inputs,
    })
}

async fn execute_task(
    task: Task,
    inputs: BTreeMap<String, Option<PathBuf>>,
    context: RunContext,
) -> Result<TaskState, ExecutionError> {
    context.set_state(&task.name, TaskState::Running);

    let scratch = tempfile::Builder::new()
        .prefix(&scratch_prefix(&task.name))
        .tempdir_in(&context.scratch_root)
        .map_err(|source| ExecutionError::Setup {
            path: context.scratch_root.clone(),
            source,
        })?;

    let outputs = task
        .output_ports
        .iter()
        .map(|(port, published)| (port.clone(), staging_path(scratch.path(), port, published)))
        .collect();

    let run = TaskRun {
        name: task.name.clone(),
        command: task.command.clone(),
        inputs,
        outputs,
        scratch: scratch.path().to_path_buf(),
        shell: context.shell.clone(),
        failures: context.failures.clone(),
    };

    debug!(task = %task.name, "Task started");
    let state = task.behavior.execute(&run).await?;
    if state == TaskState::Succeeded {
        publish_outputs(&task, &run).await;
    }
    debug!(task = %task.name, state = ?state, "Task finished");

    Ok(state)
}

/// Moves staged outputs to their published paths. An output that cannot be
/// published stays absent, so its consumers are skipped.
async fn publish_outputs(task: &Task, run: &TaskRun) {
    for (port, published) in &task.output_ports {
        let Some(staged) = run.outputs.get(port) else {
            continue;
        };
        if matches!(tokio::fs::try_exists(staged).await, Ok(false)) {
            debug!(task = %task.name, port = %port, "Output not produced");
            continue;
        }
        match tokio::fs::rename(staged, published).await {
            Ok(()) => debug!(task = %task.name, port = %port, path = %published.display(), "Output published"),
            Err(e) => warn!(
                task = %task.name,
                port = %port,
                path = %published.display(),
                error = %e,
                "Could not publish output"
            ),
        }
    }
}

fn staging_path(scratch: &Path, port: &str, published: &Path) -> PathBuf {
    match published.file_name() {
        Some(file_name) => scratch.join(file_name),
        None => scratch.join(port),
    }
}

fn scratch_prefix(task: &str) -> String {
    let mut prefix: String = task
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    prefix.push('-');
    prefix
}
