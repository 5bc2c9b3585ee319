//! Structural checks run before a graph is compiled.
//!
//! Rules enforced:
//! 1. Node ids, kinds, input and output names contain no reserved character.
//! 2. Both endpoints of every edge name an existing node.
//! 3. The source node declares the edge's output and the target node declares
//!    the edge's input.
//! 4. No input receives more than one edge.
//! 5. No two nodes produce the same task name, port name or output file.

use std::collections::HashSet;
use std::path::Path;

use crate::compiler::naming::{
    instance_in_port, instance_out_port, instance_output_path, process_task_name, schema_in_port,
    schema_out_port, schema_output_path, state_in_port, state_out_port, state_output_path,
    state_task_name,
};
use crate::dsl::{Graph, Node, NodeId};
use crate::error::GraphError;

// Names end up in file names and inside `{i:..}` placeholders.
const RESERVED: &[char] = &['/', '}', '\0'];

pub fn validate_graph(graph: &Graph) -> Result<(), GraphError> {
    for (id, node) in &graph.nodes {
        check_names(id, node)?;
    }

    let mut wired_inputs = HashSet::new();

    for (index, edge) in graph.edges.iter().enumerate() {
        let source = graph.node(&edge.source.id).ok_or_else(|| GraphError::UnknownNode {
            edge: index,
            side: "source",
            id: edge.source.id.clone(),
        })?;
        let target = graph.node(&edge.target.id).ok_or_else(|| GraphError::UnknownNode {
            edge: index,
            side: "target",
            id: edge.target.id.clone(),
        })?;

        if !source.has_output(&edge.source.output) {
            return Err(GraphError::UnknownOutput {
                edge: index,
                id: edge.source.id.clone(),
                output: edge.source.output.clone(),
            });
        }
        if !target.has_input(&edge.target.input) {
            return Err(GraphError::UnknownInput {
                edge: index,
                id: edge.target.id.clone(),
                input: edge.target.input.clone(),
            });
        }

        if !wired_inputs.insert((&edge.target.id, edge.target.input.as_str())) {
            return Err(GraphError::DuplicateInput {
                id: edge.target.id.clone(),
                input: edge.target.input.clone(),
            });
        }
    }

    // Kinds, ids and port names may all contain '-', so none of the
    // `<a>-<b>` schemes below is injective on its own.
    let mut task_names = HashSet::new();
    for (id, node) in &graph.nodes {
        for name in [process_task_name(id, &node.kind), state_task_name(id, &node.kind)] {
            if !task_names.insert(name.clone()) {
                return Err(GraphError::TaskNameCollision { name });
            }
        }
    }

    let mut ports = HashSet::new();
    for (id, node) in &graph.nodes {
        for port in node_ports(id, node) {
            if !ports.insert(port.clone()) {
                return Err(GraphError::PortCollision { port });
            }
        }
    }

    let mut files = HashSet::new();
    for (id, node) in &graph.nodes {
        for file in node_files(id, node) {
            if !files.insert(file.clone()) {
                return Err(GraphError::OutputCollision { file });
            }
        }
    }

    Ok(())
}

fn check_names(id: &NodeId, node: &Node) -> Result<(), GraphError> {
    let reserved = |what: &'static str, name: &str| {
        if name.contains(RESERVED) {
            Err(GraphError::ReservedCharacter {
                what,
                name: name.to_string(),
            })
        } else {
            Ok(())
        }
    };

    reserved("node id", id.as_str())?;
    reserved("node kind", &node.kind)?;
    for input in node.input_names() {
        reserved("input name", input)?;
    }
    for output in node.output_names() {
        reserved("output name", output)?;
    }
    Ok(())
}

fn node_ports(id: &NodeId, node: &Node) -> Vec<String> {
    let mut ports = vec![state_in_port(id), state_out_port(id)];
    for input in node.input_names() {
        ports.push(schema_in_port(id, input));
        ports.push(instance_in_port(id, input));
    }
    for output in node.output_names() {
        ports.push(schema_out_port(id, output));
        ports.push(instance_out_port(id, output));
    }
    ports
}

// Relative to the output directory, which is the same for every node.
fn node_files(id: &NodeId, node: &Node) -> Vec<String> {
    let root = Path::new("");
    let mut files = vec![state_output_path(root, id, &node.kind)];
    for output in node.output_names() {
        files.push(schema_output_path(root, id, &node.kind, output));
        files.push(instance_output_path(root, id, &node.kind, output));
    }
    files
        .into_iter()
        .map(|file| file.to_string_lossy().into_owned())
        .collect()
}
