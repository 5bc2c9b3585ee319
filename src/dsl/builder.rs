use crate::dsl::{Edge, Graph, Node, NodeId};
use serde_json::Value;
use serde_json::value::RawValue;
use std::collections::BTreeMap;

/// Programmatic construction of a [`Graph`], mostly for tests and embedders
/// that do not start from a JSON document.
pub struct GraphBuilder {
    pub nodes: BTreeMap<NodeId, Node>,
    edges: Vec<Edge>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn node(self, id: &str, kind: &str) -> NodeBuilder {
        NodeBuilder {
            graph_builder: self,
            id: NodeId::from(id),
            node: Node {
                kind: kind.to_string(),
                state: RawValue::NULL.to_owned(),
                inputs: BTreeMap::new(),
                outputs: BTreeMap::new(),
            },
        }
    }

    /// Adds an edge from `source`'s `output` to `target`'s `input`. The
    /// declared outputs of the source node are updated to list the target.
    pub fn connect(mut self, source: &str, output: &str, target: &str, input: &str) -> Self {
        if let Some(node) = self.nodes.get_mut(&NodeId::from(source)) {
            let downstream = node.outputs.entry(output.to_string()).or_default();
            let target_id = NodeId::from(target);
            if !downstream.contains(&target_id) {
                downstream.push(target_id);
            }
        }
        self.edges.push(Edge::new(source, output, target, input));
        self
    }

    pub fn build(self) -> Graph {
        Graph {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct NodeBuilder {
    graph_builder: GraphBuilder,
    id: NodeId,
    node: Node,
}

impl NodeBuilder {
    pub fn state(mut self, state: Value) -> Self {
        self.node.state = serde_json::value::to_raw_value(&state)
            .unwrap_or_else(|e| panic!("state of node '{}' cannot be serialized: {}", self.id, e));
        self
    }

    /// Uses `text` as the state blob without reformatting it.
    ///
    /// # Panics
    ///
    /// If `text` is not a single valid JSON value.
    pub fn raw_state(mut self, text: &str) -> Self {
        self.node.state = RawValue::from_string(text.to_string())
            .unwrap_or_else(|e| panic!("state of node '{}' is not valid JSON: {}", self.id, e));
        self
    }

    pub fn input(mut self, name: &str) -> Self {
        self.node.inputs.insert(name.to_string(), Value::Null);
        self
    }

    pub fn output(mut self, name: &str) -> Self {
        self.node.outputs.entry(name.to_string()).or_default();
        self
    }

    pub fn build(mut self) -> GraphBuilder {
        self.graph_builder.nodes.insert(self.id, self.node);
        self.graph_builder
    }
}
