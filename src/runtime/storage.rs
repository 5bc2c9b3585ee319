use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::dsl::NodeId;
use crate::error::ExecutionError;

/// Node id to the captured output of its failed command.
pub type FailureMap = BTreeMap<NodeId, String>;

/// A process task whose command exited non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub node: NodeId,
    pub output: String,
}

impl Failure {
    pub fn new(node: NodeId, output: impl Into<String>) -> Self {
        Self {
            node,
            output: output.into(),
        }
    }
}

/// Creates the failure channel for one run.
///
/// Must be called inside a tokio runtime: the collector drains on its own
/// task.
pub fn channel() -> (FailureSink, FailureCollector) {
    let (sender, mut receiver) = mpsc::unbounded_channel::<Failure>();

    let handle = tokio::spawn(async move {
        let mut failures = FailureMap::new();
        while let Some(failure) = receiver.recv().await {
            debug!(node = %failure.node, "Failure recorded");
            failures.insert(failure.node, failure.output);
        }
        failures
    });

    (FailureSink { sender }, FailureCollector { handle })
}

/// Producer side. Clone one per task.
#[derive(Debug, Clone)]
pub struct FailureSink {
    sender: mpsc::UnboundedSender<Failure>,
}

impl FailureSink {
    pub fn emit(&self, failure: Failure) {
        if let Err(e) = self.sender.send(failure) {
            warn!(node = %e.0.node, "Failure dropped: collector is gone");
        }
    }
}

/// Consumer side.
pub struct FailureCollector {
    handle: JoinHandle<FailureMap>,
}

impl FailureCollector {
    /// Waits until every [`FailureSink`] clone has been dropped, then returns
    /// everything that was emitted.
    pub async fn finish(self) -> Result<FailureMap, ExecutionError> {
        self.handle.await.map_err(|_| ExecutionError::CollectorClosed)
    }
}
