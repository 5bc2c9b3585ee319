pub mod builder;

use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;

/// Opaque node identifier.
///
/// Graph documents have used both numeric and string ids over time. Both are
/// accepted and stored as text, so a node named `7` formats the same way
/// whichever convention produced it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(id) => NodeId(id),
            RawId::Number(id) => NodeId(id.to_string()),
        })
    }
}

/// One instance of a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Node {
    /// Selects the external block program.
    pub kind: String,
    /// Stored exactly as it appeared in the graph document.
    #[serde(default = "null_state")]
    pub state: Box<RawValue>,
    /// Only the names are meaningful; values are whatever the editor stored.
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
    /// Output name to downstream node ids. Descriptive only.
    #[serde(default)]
    pub outputs: BTreeMap<String, Vec<NodeId>>,
}

fn null_state() -> Box<RawValue> {
    RawValue::NULL.to_owned()
}

impl Node {
    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.keys().map(String::as_str)
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.contains_key(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSource {
    #[serde(rename = "ID")]
    pub id: NodeId,
    #[serde(rename = "Output")]
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeTarget {
    #[serde(rename = "ID")]
    pub id: NodeId,
    #[serde(rename = "Input")]
    pub input: String,
}

/// Data dependency from one node's named output to another node's named input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Edge {
    pub source: EdgeSource,
    pub target: EdgeTarget,
}

impl Edge {
    pub fn new(source: &str, output: &str, target: &str, input: &str) -> Self {
        Self {
            source: EdgeSource { id: NodeId::from(source), output: output.to_string() },
            target: EdgeTarget { id: NodeId::from(target), input: input.to_string() },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Graph {
    #[serde(default)]
    pub nodes: BTreeMap<NodeId, Node>,
    #[serde(default, deserialize_with = "deserialize_edges")]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }
}

// Edges arrive either as a list or as an object keyed by edge id.
fn deserialize_edges<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Edge>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum EdgeSet {
        List(Vec<Edge>),
        Keyed(BTreeMap<String, Edge>),
    }

    Ok(match EdgeSet::deserialize(deserializer)? {
        EdgeSet::List(edges) => edges,
        EdgeSet::Keyed(edges) => edges.into_values().collect(),
    })
}
