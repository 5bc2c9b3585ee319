use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum number of tasks the scheduler runs at the same time.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Where block programs live and how they are started.
///
/// With the defaults a node of kind `csv-import` validates through
/// `node <directory>/@underlay/pipeline-runtime/lib/csv-import/validate.js`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockModules {
    /// Root of the installed modules, conventionally `node_modules`.
    pub directory: PathBuf,
    /// Package path below `directory` holding one directory per kind.
    pub package: PathBuf,
    pub interpreter: String,
    pub extension: String,
}

impl Default for BlockModules {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("node_modules"),
            package: PathBuf::from("@underlay/pipeline-runtime/lib"),
            interpreter: "node".to_string(),
            extension: "js".to_string(),
        }
    }
}

impl BlockModules {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    /// Directory of the module implementing `kind`.
    pub fn module_path(&self, kind: &str) -> PathBuf {
        self.directory.join(&self.package).join(kind)
    }

    /// Path of the `program` (`validate` or `evaluate`) script for `kind`.
    pub fn program_path(&self, kind: &str, program: &str) -> PathBuf {
        self.module_path(kind).join(format!("{}.{}", program, self.extension))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub modules: BlockModules,
    /// Shell used to run synthesized commands (`<shell> -c <command>`).
    pub shell: String,
    pub max_concurrency: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            modules: BlockModules::default(),
            shell: "sh".to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl RuntimeConfig {
    pub fn new(module_directory: impl Into<PathBuf>) -> Self {
        Self {
            modules: BlockModules::new(module_directory),
            ..Self::default()
        }
    }

    pub fn with_interpreter(mut self, interpreter: &str) -> Self {
        self.modules.interpreter = interpreter.to_string();
        self
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.modules.extension = extension.to_string();
        self
    }

    pub fn with_package(mut self, package: impl AsRef<Path>) -> Self {
        self.modules.package = package.as_ref().to_path_buf();
        self
    }

    pub fn with_shell(mut self, shell: &str) -> Self {
        self.shell = shell.to_string();
        self
    }

    /// Values below one are raised to one.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }
}
