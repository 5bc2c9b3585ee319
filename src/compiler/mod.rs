pub mod command;
pub mod core;
pub mod loader;
pub mod naming;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Validate runs schema checks only; evaluate also moves data instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Validate,
    Evaluate,
}

impl Mode {
    /// Run name, and also the block program invoked for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Validate => "validate",
            Mode::Evaluate => "evaluate",
        }
    }

    pub fn with_instances(&self) -> bool {
        matches!(self, Mode::Evaluate)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
