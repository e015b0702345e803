use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// External toolchain used to build logic assemblies.
///
/// `{output}` in an argument is replaced with the output path; an argument
/// that is exactly `{sources}` expands to one argument per source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Root of the script sources, scanned recursively.
    pub source_dir: PathBuf,
    /// Directory holding compiled, loadable assemblies.
    pub output_dir: PathBuf,
    /// Default logic assembly loaded with every secondary domain.
    pub logic_assembly: String,
    pub source_extension: String,
    pub compiler: Option<CompilerConfig>,
    pub memory_limit_bytes: Option<usize>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("assets/scripts"),
            output_dir: PathBuf::from("assets/scripts/build"),
            logic_assembly: "GameScript".to_string(),
            source_extension: "js".to_string(),
            compiler: None,
            memory_limit_bytes: None,
        }
    }
}

impl ScriptConfig {
    /// Extension of compiled assemblies in [`output_dir`](Self::output_dir).
    pub const ASSEMBLY_EXTENSION: &'static str = "js";

    pub fn logic_assembly_path(&self) -> PathBuf {
        self.output_dir
            .join(&self.logic_assembly)
            .with_extension(Self::ASSEMBLY_EXTENSION)
    }
}
