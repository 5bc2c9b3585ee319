//! Names for tasks, ports and output files.
//!
//! Every function here is pure: the same node and role always give the same
//! string. Port names are built from the node id alone, so they are unique as
//! long as node ids are unique within a graph. Task and file names also carry
//! the node kind.

use crate::dsl::NodeId;
use std::path::{Path, PathBuf};

pub fn process_task_name(id: &NodeId, kind: &str) -> String {
    format!("{}-{}", kind, id)
}

pub fn state_task_name(id: &NodeId, kind: &str) -> String {
    format!("{}-{}-state", kind, id)
}

pub fn state_in_port(id: &NodeId) -> String {
    format!("{}-state-in", id)
}

pub fn state_out_port(id: &NodeId) -> String {
    format!("{}-state-out", id)
}

pub fn schema_in_port(id: &NodeId, input: &str) -> String {
    format!("{}-{}.input.schema", id, input)
}

pub fn schema_out_port(id: &NodeId, output: &str) -> String {
    format!("{}-{}.output.schema", id, output)
}

pub fn instance_in_port(id: &NodeId, input: &str) -> String {
    format!("{}-{}.input.instance", id, input)
}

pub fn instance_out_port(id: &NodeId, output: &str) -> String {
    format!("{}-{}.output.instance", id, output)
}

pub fn state_output_path(output_directory: &Path, id: &NodeId, kind: &str) -> PathBuf {
    output_directory.join(format!("{}-{}.state.json", kind, id))
}

pub fn schema_output_path(output_directory: &Path, id: &NodeId, kind: &str, output: &str) -> PathBuf {
    output_directory.join(format!("{}-{}-{}.schema", kind, id, output))
}

pub fn instance_output_path(output_directory: &Path, id: &NodeId, kind: &str, output: &str) -> PathBuf {
    output_directory.join(format!("{}-{}-{}.instance", kind, id, output))
}

/// Placeholder the engine replaces with the file bound to input `port`.
pub fn input_placeholder(port: &str) -> String {
    format!("{{i:{}}}", port)
}

/// Placeholder the engine replaces with the file bound to output `port`.
pub fn output_placeholder(port: &str) -> String {
    format!("{{o:{}}}", port)
}
