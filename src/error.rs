use std::path::PathBuf;
use thiserror::Error;

use crate::dsl::NodeId;

/// Structural problems found in a graph before anything is compiled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("edge {edge}: {side} node '{id}' does not exist")]
    UnknownNode {
        edge: usize,
        side: &'static str,
        id: NodeId,
    },

    #[error("edge {edge}: node '{id}' has no output named '{output}'")]
    UnknownOutput {
        edge: usize,
        id: NodeId,
        output: String,
    },

    #[error("edge {edge}: node '{id}' has no input named '{input}'")]
    UnknownInput {
        edge: usize,
        id: NodeId,
        input: String,
    },

    #[error("input '{input}' of node '{id}' has more than one incoming edge")]
    DuplicateInput { id: NodeId, input: String },

    #[error("task name '{name}' is produced by more than one node")]
    TaskNameCollision { name: String },

    #[error("port name '{port}' is produced by more than one node")]
    PortCollision { port: String },

    #[error("output file '{file}' is published by more than one node")]
    OutputCollision { file: String },

    #[error("{what} '{name}' contains a reserved character ('/', '}}' or NUL)")]
    ReservedCharacter { what: &'static str, name: String },
}

/// Errors that abort a whole run. Per-node failures are not errors; they end
/// up in the failure map.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to prepare directory {path}: {source}")]
    Setup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("task '{task}': could not start command: {source}")]
    Spawn {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error("task '{task}': {source}")]
    Io {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error("task '{task}': input port '{port}' refers to an unknown producer")]
    UnresolvedPort { task: String, port: String },

    #[error("task '{task}': placeholder '{placeholder}' has no bound path")]
    UnresolvedPlaceholder { task: String, placeholder: String },

    #[error("dependency cycle between tasks: {}", tasks.join(", "))]
    Cycle { tasks: Vec<String> },

    #[error("task panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("failure collector stopped before the run finished")]
    CollectorClosed,
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid graph: {0}")]
    Graph(#[from] GraphError),

    #[error("run aborted: {0}")]
    Execution(#[from] ExecutionError),
}
