pub mod compiler;
pub mod config;
pub mod dsl;
pub mod error;
pub mod nodes;
pub mod runtime;
pub mod workflow;

pub use compiler::Mode;
pub use config::RuntimeConfig;
pub use dsl::{Graph, NodeId};
pub use error::{ExecutionError, GraphError, WorkflowError};
pub use runtime::storage::FailureMap;
pub use workflow::Workflow;
