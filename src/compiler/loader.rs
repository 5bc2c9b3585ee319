use anyhow::{Context as AnyhowContext, Result};
use std::fs;
use std::path::Path;
use crate::dsl::Graph;

pub fn load_graph_from_json(file_path: impl AsRef<Path>) -> Result<Graph> {
    let file_path = file_path.as_ref();
    let json_content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read graph file from {}", file_path.display()))?;

    parse_graph(&json_content)
        .with_context(|| format!("Failed to load graph from {}", file_path.display()))
}

pub fn parse_graph(json_content: &str) -> Result<Graph> {
    let graph = Graph::from_json(json_content)
        .context("Failed to deserialize graph JSON")?;

    Ok(graph)
}
