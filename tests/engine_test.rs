use async_trait::async_trait;
use pipeline_workflow::compiler::Mode;
use pipeline_workflow::dsl::NodeId;
use pipeline_workflow::error::ExecutionError;
use pipeline_workflow::runtime::blueprint::{PortRef, Task, TaskGraph, TaskRole};
use pipeline_workflow::runtime::context::RunContext;
use pipeline_workflow::runtime::engine::{Engine, Scheduler};
use pipeline_workflow::runtime::node::TaskBehavior;
use pipeline_workflow::runtime::storage;
use pipeline_workflow::runtime::task::{TaskRun, TaskState};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

/// Records start and end of each task, tracks how many run at once and
/// writes every output before returning a fixed state.
#[derive(Debug)]
struct Probe {
    outcome: TaskState,
    delay: Duration,
    log: Arc<Mutex<Vec<String>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl TaskBehavior for Probe {
    async fn execute(&self, run: &TaskRun) -> Result<TaskState, ExecutionError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.log.lock().unwrap().push(format!("start {}", run.name));

        tokio::time::sleep(self.delay).await;
        for path in run.outputs.values() {
            tokio::fs::write(path, &run.name).await.unwrap();
        }

        self.log.lock().unwrap().push(format!("end {}", run.name));
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(self.outcome)
    }
}

/// Reads its inputs and remembers where its outputs were staged.
#[derive(Debug, Default)]
struct Reader {
    inputs: Mutex<Vec<(PathBuf, Option<String>)>>,
    staged_in_scratch: Mutex<Option<bool>>,
}

#[async_trait]
impl TaskBehavior for Reader {
    async fn execute(&self, run: &TaskRun) -> Result<TaskState, ExecutionError> {
        for path in run.inputs.values().flatten() {
            let content = tokio::fs::read_to_string(path).await.ok();
            self.inputs.lock().unwrap().push((path.clone(), content));
        }
        let staged = run.scratch.is_dir() && run.outputs.values().all(|p| p.starts_with(&run.scratch));
        *self.staged_in_scratch.lock().unwrap() = Some(staged);
        Ok(TaskState::Succeeded)
    }
}

#[derive(Debug)]
struct Broken;

#[async_trait]
impl TaskBehavior for Broken {
    async fn execute(&self, run: &TaskRun) -> Result<TaskState, ExecutionError> {
        Err(ExecutionError::Io {
            task: run.name.clone(),
            source: std::io::Error::other("disk on fire"),
        })
    }
}

struct Harness {
    dir: TempDir,
    log: Arc<Mutex<Vec<String>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::create_dir(dir.path().join("out")).expect("Failed to create output dir");
        Self {
            dir,
            log: Arc::default(),
            active: Arc::default(),
            peak: Arc::default(),
        }
    }

    fn probe(&self, outcome: TaskState, delay_ms: u64) -> Arc<dyn TaskBehavior> {
        Arc::new(Probe {
            outcome,
            delay: Duration::from_millis(delay_ms),
            log: self.log.clone(),
            active: self.active.clone(),
            peak: self.peak.clone(),
        })
    }

    fn published(&self, port: &str) -> PathBuf {
        self.dir.path().join("out").join(port)
    }

    /// `inputs` are `(port, producer task, producer port)`.
    fn task(&self, name: &str, inputs: &[(&str, &str, &str)], outputs: &[&str], behavior: Arc<dyn TaskBehavior>) -> Task {
        Task {
            name: name.to_string(),
            node: NodeId::from(name),
            role: TaskRole::Process,
            command: String::new(),
            input_ports: inputs
                .iter()
                .map(|(port, task, source)| (port.to_string(), Some(PortRef::new(*task, *source))))
                .collect(),
            output_ports: outputs.iter().map(|port| (port.to_string(), self.published(port))).collect(),
            behavior,
        }
    }

    async fn run(&self, tasks: Vec<Task>, max_concurrency: usize) -> (Result<(), ExecutionError>, BTreeMap<String, TaskState>) {
        let graph = TaskGraph {
            name: "test".to_string(),
            mode: Mode::Validate,
            max_concurrency,
            tasks,
        };
        let (sink, collector) = storage::channel();
        let context = RunContext::new(Uuid::new_v4(), self.dir.path().join(".scratch"), "sh", sink);
        let states = context.states();

        let result = Engine::new().run(graph, context).await;
        collector.finish().await.expect("collector failed");
        (result, states.snapshot())
    }

    fn position(&self, entry: &str) -> usize {
        let log = self.log.lock().unwrap();
        log.iter()
            .position(|line| line == entry)
            .unwrap_or_else(|| panic!("'{}' not in log {:?}", entry, *log))
    }
}

#[tokio::test]
async fn test_dependencies_finish_first() {
    let h = Harness::new();
    let tasks = vec![
        h.task("a", &[], &["a.out"], h.probe(TaskState::Succeeded, 0)),
        h.task("b", &[("in", "a", "a.out")], &["b.out"], h.probe(TaskState::Succeeded, 80)),
        h.task("c", &[("in", "a", "a.out")], &["c.out"], h.probe(TaskState::Succeeded, 10)),
        h.task("d", &[("left", "b", "b.out"), ("right", "c", "c.out")], &["d.out"], h.probe(TaskState::Succeeded, 0)),
    ];

    let (result, states) = h.run(tasks, 4).await;
    result.expect("run failed");

    assert!(h.position("end a") < h.position("start b"));
    assert!(h.position("end a") < h.position("start c"));
    assert!(h.position("end b") < h.position("start d"));
    assert!(h.position("end c") < h.position("start d"));

    assert!(states.values().all(|state| *state == TaskState::Succeeded));
    assert_eq!(std::fs::read_to_string(h.published("d.out")).unwrap(), "d");
    assert!(!h.dir.path().join(".scratch").exists());
}

#[tokio::test]
async fn test_concurrency_limit() {
    let h = Harness::new();
    let tasks = (0..10)
        .map(|i| h.task(&format!("t{}", i), &[], &[], h.probe(TaskState::Succeeded, 40)))
        .collect();

    let (result, _) = h.run(tasks, 3).await;
    result.expect("run failed");

    let peak = h.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency {}", peak);
    assert!(peak >= 2, "independent tasks never overlapped");
}

#[tokio::test]
async fn test_limit_of_one_runs_sequentially() {
    let h = Harness::new();
    let tasks = (0..4)
        .map(|i| h.task(&format!("t{}", i), &[], &[], h.probe(TaskState::Succeeded, 10)))
        .collect();

    let (result, _) = h.run(tasks, 1).await;
    result.expect("run failed");
    assert_eq!(h.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_inputs_bound_to_published_outputs() {
    let h = Harness::new();
    let reader = Arc::new(Reader::default());
    let tasks = vec![
        h.task("producer", &[], &["value"], h.probe(TaskState::Succeeded, 0)),
        h.task("consumer", &[("in", "producer", "value")], &["result"], reader.clone()),
    ];

    let (result, _) = h.run(tasks, 2).await;
    result.expect("run failed");

    let inputs = reader.inputs.lock().unwrap().clone();
    assert_eq!(inputs, vec![(h.published("value"), Some("producer".to_string()))]);
    assert_eq!(*reader.staged_in_scratch.lock().unwrap(), Some(true));
}

#[tokio::test]
async fn test_failed_task_publishes_nothing() {
    let h = Harness::new();
    let reader = Arc::new(Reader::default());
    let tasks = vec![
        h.task("bad", &[], &["bad.out"], h.probe(TaskState::Failed, 0)),
        h.task("after", &[("in", "bad", "bad.out")], &[], reader.clone()),
    ];

    let (result, states) = h.run(tasks, 2).await;
    result.expect("run failed");

    assert_eq!(states["bad"], TaskState::Failed);
    assert!(!h.published("bad.out").exists());
    // The consumer still ran and found nothing at the published path.
    assert_eq!(states["after"], TaskState::Succeeded);
    assert_eq!(*reader.inputs.lock().unwrap(), vec![(h.published("bad.out"), None)]);
}

#[tokio::test]
async fn test_skipped_task_does_not_block_dependents() {
    let h = Harness::new();
    let tasks = vec![
        h.task("skipped", &[], &["s.out"], h.probe(TaskState::Skipped, 0)),
        h.task("next", &[("in", "skipped", "s.out")], &[], h.probe(TaskState::Succeeded, 0)),
    ];

    let (result, states) = h.run(tasks, 2).await;
    result.expect("run failed");

    assert_eq!(states["skipped"], TaskState::Skipped);
    assert_eq!(states["next"], TaskState::Succeeded);
    assert!(!h.published("s.out").exists());
    assert!(h.position("end skipped") < h.position("start next"));
}

#[tokio::test]
async fn test_cycle_is_rejected() {
    let h = Harness::new();
    let tasks = vec![
        h.task("root", &[], &["r"], h.probe(TaskState::Succeeded, 0)),
        h.task("x", &[("a", "root", "r"), ("b", "y", "y.out")], &["x.out"], h.probe(TaskState::Succeeded, 0)),
        h.task("y", &[("a", "x", "x.out")], &["y.out"], h.probe(TaskState::Succeeded, 0)),
    ];

    let (result, _) = h.run(tasks, 2).await;
    match result {
        Err(ExecutionError::Cycle { tasks }) => assert_eq!(tasks, vec!["x".to_string(), "y".to_string()]),
        other => panic!("expected a cycle error, got {:?}", other),
    }
    assert!(h.log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unresolved_port() {
    let h = Harness::new();
    let tasks = vec![
        h.task("a", &[], &["a.out"], h.probe(TaskState::Succeeded, 0)),
        h.task("b", &[("in", "a", "no-such-port")], &[], h.probe(TaskState::Succeeded, 0)),
    ];

    let (result, _) = h.run(tasks, 2).await;
    assert!(matches!(
        result,
        Err(ExecutionError::UnresolvedPort { ref task, ref port }) if task == "b" && port == "in"
    ));

    let tasks = vec![h.task("c", &[("in", "ghost", "out")], &[], h.probe(TaskState::Succeeded, 0))];
    let (result, _) = h.run(tasks, 2).await;
    assert!(matches!(result, Err(ExecutionError::UnresolvedPort { .. })));
    assert!(h.log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_fatal_error_aborts_run() {
    let h = Harness::new();
    let tasks = vec![
        h.task("broken", &[], &["b.out"], Arc::new(Broken)),
        h.task("after", &[("in", "broken", "b.out")], &[], h.probe(TaskState::Succeeded, 0)),
    ];

    let (result, _) = h.run(tasks, 2).await;
    assert!(matches!(result, Err(ExecutionError::Io { ref task, .. }) if task == "broken"));
    assert!(h.log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_graph() {
    let h = Harness::new();
    let (result, states) = h.run(Vec::new(), 4).await;
    result.expect("run failed");
    assert!(states.is_empty());
}

#[tokio::test]
async fn test_unpublishable_output_is_left_absent() {
    let h = Harness::new();
    let reader = Arc::new(Reader::default());
    let mut producer = h.task("producer", &[], &[], h.probe(TaskState::Succeeded, 0));
    let unreachable = h.dir.path().join("missing-dir").join("value");
    producer.output_ports.insert("value".to_string(), unreachable.clone());
    let tasks = vec![
        producer,
        h.task("consumer", &[("in", "producer", "value")], &[], reader.clone()),
    ];

    let (result, states) = h.run(tasks, 2).await;
    result.expect("run failed");

    assert_eq!(states["producer"], TaskState::Succeeded);
    assert!(!unreachable.exists());
    assert_eq!(*reader.inputs.lock().unwrap(), vec![(unreachable, None)]);
}
