use crate::compiler::Mode;
use crate::compiler::naming::{
    input_placeholder, instance_in_port, instance_out_port, output_placeholder, schema_in_port,
    schema_out_port, state_in_port,
};
use crate::config::BlockModules;
use crate::dsl::{Node, NodeId};

/// Builds the command line that runs a node's `validate` or `evaluate`
/// program.
///
/// The result is a template: file arguments are `{i:port}` / `{o:port}`
/// placeholders that the engine binds to real paths before running it.
pub struct CommandSynthesizer<'a> {
    modules: &'a BlockModules,
}

impl<'a> CommandSynthesizer<'a> {
    pub fn new(modules: &'a BlockModules) -> Self {
        Self { modules }
    }

    /// Argument order is fixed: state, input schemas, input instances,
    /// output schemas, output instances. Each flag is present even when no
    /// names follow it; the instance flags only exist in evaluate mode.
    pub fn synthesize(&self, id: &NodeId, node: &Node, mode: Mode) -> String {
        let program = self.modules.program_path(&node.kind, mode.name());

        let mut parts = vec![
            quote(&self.modules.interpreter),
            quote(&program.to_string_lossy()),
            format!("--state {}", input_placeholder(&state_in_port(id))),
        ];

        parts.push(fragment("--input-schemas", node.input_names(), |input| {
            input_placeholder(&schema_in_port(id, input))
        }));
        if mode.with_instances() {
            parts.push(fragment("--input-instances", node.input_names(), |input| {
                input_placeholder(&instance_in_port(id, input))
            }));
        }

        parts.push(fragment("--output-schemas", node.output_names(), |output| {
            output_placeholder(&schema_out_port(id, output))
        }));
        if mode.with_instances() {
            parts.push(fragment("--output-instances", node.output_names(), |output| {
                output_placeholder(&instance_out_port(id, output))
            }));
        }

        parts.join(" ")
    }
}

fn fragment<'n>(
    flag: &str,
    names: impl Iterator<Item = &'n str>,
    placeholder: impl Fn(&str) -> String,
) -> String {
    let mut fragment = flag.to_string();
    for name in names {
        fragment.push(' ');
        fragment.push_str(&quote(name));
        fragment.push('=');
        fragment.push_str(&placeholder(name));
    }
    fragment
}

/// Single-quotes `word` for `sh` unless it only contains characters the
/// shell passes through untouched.
pub fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./@:=+,%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
