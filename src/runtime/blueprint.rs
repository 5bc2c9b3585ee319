use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::compiler::Mode;
use crate::dsl::NodeId;
use crate::runtime::node::TaskBehavior;

/// An output port of a producer task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub task: String,
    pub port: String,
}

impl PortRef {
    pub fn new(task: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            port: port.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRole {
    /// Writes the node's stored state to a file.
    State,
    /// Runs the node's block program.
    Process,
}

/// A compiled unit of work.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub node: NodeId,
    pub role: TaskRole,
    /// Command template containing `{i:port}` / `{o:port}` placeholders.
    pub command: String,
    /// Input port to its producer. `None` marks a declared input no edge feeds.
    pub input_ports: BTreeMap<String, Option<PortRef>>,
    /// Output port to the final file it is published at.
    pub output_ports: BTreeMap<String, PathBuf>,
    pub behavior: Arc<dyn TaskBehavior>,
}

impl Task {
    /// Producer references of the wired input ports.
    pub fn producers(&self) -> impl Iterator<Item = (&str, &PortRef)> {
        self.input_ports
            .iter()
            .filter_map(|(port, source)| source.as_ref().map(|source| (port.as_str(), source)))
    }
}

/// The task dependency graph handed to a scheduler as one named run.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    pub name: String,
    pub mode: Mode,
    pub max_concurrency: usize,
    pub tasks: Vec<Task>,
}

impl TaskGraph {
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.name == name)
    }

    pub fn tasks_with_role(&self, role: TaskRole) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |task| task.role == role)
    }
}
