use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};

use crate::compiler::command::quote;
use crate::error::ExecutionError;
use crate::runtime::storage::FailureSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Runnable,
    Running,
    Skipped,
    Succeeded,
    Failed,
}

/// One execution of a task, with every port bound to a concrete path.
#[derive(Debug, Clone)]
pub struct TaskRun {
    pub name: String,
    pub command: String,
    /// Input port to the producer's published file; `None` when unwired.
    pub inputs: BTreeMap<String, Option<PathBuf>>,
    /// Output port to its staging path inside `scratch`.
    pub outputs: BTreeMap<String, PathBuf>,
    /// Private working directory, removed when the task ends.
    pub scratch: PathBuf,
    pub shell: String,
    pub failures: FailureSink,
}

impl TaskRun {
    /// Input ports whose file is not present. Anything other than a regular
    /// file counts as absent; stat errors other than "not found" are returned.
    pub async fn missing_inputs(&self) -> Result<Vec<&str>, ExecutionError> {
        let mut missing = Vec::new();
        for (port, path) in &self.inputs {
            let Some(path) = path else {
                missing.push(port.as_str());
                continue;
            };
            match tokio::fs::metadata(path).await {
                Ok(metadata) if metadata.is_file() => {}
                Ok(_) => missing.push(port.as_str()),
                Err(e) if e.kind() == ErrorKind::NotFound => missing.push(port.as_str()),
                Err(source) => {
                    return Err(ExecutionError::Io {
                        task: self.name.clone(),
                        source,
                    });
                }
            }
        }
        Ok(missing)
    }

    /// Replaces every `{i:port}` and `{o:port}` in the command with the
    /// shell-quoted path bound to that port.
    pub fn render_command(&self) -> Result<String, ExecutionError> {
        let mut rendered = String::with_capacity(self.command.len());
        let mut rest = self.command.as_str();

        while let Some(start) = find_placeholder(rest) {
            rendered.push_str(&rest[..start]);
            let tail = &rest[start..];
            let Some(end) = tail.find('}') else {
                rendered.push_str(tail);
                rest = "";
                break;
            };
            let placeholder = &tail[..=end];
            let port = &placeholder[3..placeholder.len() - 1];
            let path = if placeholder.starts_with("{i:") {
                self.inputs.get(port).and_then(|path| path.as_ref())
            } else {
                self.outputs.get(port)
            };
            let path = path.ok_or_else(|| ExecutionError::UnresolvedPlaceholder {
                task: self.name.clone(),
                placeholder: placeholder.to_string(),
            })?;
            rendered.push_str(&quote(&path.to_string_lossy()));
            rest = &tail[end + 1..];
        }

        rendered.push_str(rest);
        Ok(rendered)
    }
}

fn find_placeholder(text: &str) -> Option<usize> {
    match (text.find("{i:"), text.find("{o:")) {
        (Some(i), Some(o)) => Some(i.min(o)),
        (i, o) => i.or(o),
    }
}
