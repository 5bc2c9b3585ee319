use crate::compiler::Mode;
use crate::compiler::command::CommandSynthesizer;
use crate::compiler::naming::{
    instance_in_port, instance_out_port, instance_output_path, output_placeholder,
    process_task_name, schema_in_port, schema_out_port, schema_output_path, state_in_port,
    state_out_port, state_output_path, state_task_name,
};
use crate::compiler::validator::validate_graph;
use crate::config::RuntimeConfig;
use crate::dsl::{Edge, Graph, Node, NodeId};
use crate::error::GraphError;
use crate::nodes::{BlockProcess, EmitState};
use crate::runtime::blueprint::{PortRef, Task, TaskGraph, TaskRole};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Turns a [`Graph`] into a [`TaskGraph`] for one mode.
///
/// Every node becomes a state task and a process task. The process task reads
/// the state file and writes one schema file per output (plus one instance
/// file per output in evaluate mode). Edges then wire a source's output ports
/// into the target's input ports.
pub struct Compiler<'a> {
    config: &'a RuntimeConfig,
}

impl<'a> Compiler<'a> {
    pub fn new(config: &'a RuntimeConfig) -> Self {
        Self { config }
    }

    pub fn compile(&self, graph: &Graph, mode: Mode, output_directory: &Path) -> Result<TaskGraph, GraphError> {
        // 0. Structural checks
        validate_graph(graph)?;

        // 1. Per-node tasks
        let synthesizer = CommandSynthesizer::new(&self.config.modules);
        let mut tasks = Vec::with_capacity(graph.nodes.len() * 2);
        let mut process_index: HashMap<&NodeId, usize> = HashMap::new();

        for (id, node) in &graph.nodes {
            let state_task = self.state_task(id, node, output_directory);
            let state_source = PortRef::new(&state_task.name, state_out_port(id));
            tasks.push(state_task);

            let command = synthesizer.synthesize(id, node, mode);
            process_index.insert(id, tasks.len());
            tasks.push(self.process_task(id, node, mode, command, state_source, output_directory));
        }

        // 2. Edges
        for (index, edge) in graph.edges.iter().enumerate() {
            self.wire(graph, &mut tasks, &process_index, index, edge, mode)?;
        }

        debug!(run = mode.name(), nodes = graph.nodes.len(), tasks = tasks.len(), "Compiled task graph");

        Ok(TaskGraph {
            name: mode.name().to_string(),
            mode,
            max_concurrency: self.config.max_concurrency,
            tasks,
        })
    }

    fn state_task(&self, id: &NodeId, node: &Node, output_directory: &Path) -> Task {
        let port = state_out_port(id);
        Task {
            name: state_task_name(id, &node.kind),
            node: id.clone(),
            role: TaskRole::State,
            command: output_placeholder(&port),
            input_ports: BTreeMap::new(),
            output_ports: BTreeMap::from([(port, state_output_path(output_directory, id, &node.kind))]),
            behavior: Arc::new(EmitState::new(node.state.get())),
        }
    }

    fn process_task(
        &self,
        id: &NodeId,
        node: &Node,
        mode: Mode,
        command: String,
        state_source: PortRef,
        output_directory: &Path,
    ) -> Task {
        let mut input_ports = BTreeMap::new();
        input_ports.insert(state_in_port(id), Some(state_source));
        // Declared inputs start unwired; edges fill them in.
        for input in node.input_names() {
            input_ports.insert(schema_in_port(id, input), None);
            if mode.with_instances() {
                input_ports.insert(instance_in_port(id, input), None);
            }
        }

        let mut output_ports = BTreeMap::new();
        for output in node.output_names() {
            output_ports.insert(
                schema_out_port(id, output),
                schema_output_path(output_directory, id, &node.kind, output),
            );
            if mode.with_instances() {
                output_ports.insert(
                    instance_out_port(id, output),
                    instance_output_path(output_directory, id, &node.kind, output),
                );
            }
        }

        Task {
            name: process_task_name(id, &node.kind),
            node: id.clone(),
            role: TaskRole::Process,
            command,
            input_ports,
            output_ports,
            behavior: Arc::new(BlockProcess::new(id.clone())),
        }
    }

    fn wire(
        &self,
        graph: &Graph,
        tasks: &mut [Task],
        process_index: &HashMap<&NodeId, usize>,
        index: usize,
        edge: &Edge,
        mode: Mode,
    ) -> Result<(), GraphError> {
        let source = graph.node(&edge.source.id).ok_or_else(|| GraphError::UnknownNode {
            edge: index,
            side: "source",
            id: edge.source.id.clone(),
        })?;
        let &target = process_index.get(&edge.target.id).ok_or_else(|| GraphError::UnknownNode {
            edge: index,
            side: "target",
            id: edge.target.id.clone(),
        })?;

        let source_task = process_task_name(&edge.source.id, &source.kind);
        let (source_id, output) = (&edge.source.id, edge.source.output.as_str());
        let (target_id, input) = (&edge.target.id, edge.target.input.as_str());
        let ports = &mut tasks[target].input_ports;

        ports.insert(
            schema_in_port(target_id, input),
            Some(PortRef::new(&source_task, schema_out_port(source_id, output))),
        );
        if mode.with_instances() {
            ports.insert(
                instance_in_port(target_id, input),
                Some(PortRef::new(&source_task, instance_out_port(source_id, output))),
            );
        }

        Ok(())
    }
}
