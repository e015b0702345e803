//! Runs the external script toolchain.
//!
//! Compiling blocks until the process exits. A failed build is reported and
//! nothing else is touched; the caller decides whether to reload.

use crate::config::{CompilerConfig, ScriptConfig};
use crate::error::ScriptError;
use std::path::{Path, PathBuf};
use std::process::Command;

pub struct ScriptCompiler {
    toolchain: CompilerConfig,
    source_dir: PathBuf,
    output_dir: PathBuf,
    logic_assembly: String,
    source_extension: String,
}

impl ScriptCompiler {
    /// `None` when no toolchain is configured.
    pub fn from_config(config: &ScriptConfig) -> Option<Self> {
        let toolchain = config.compiler.clone()?;
        Some(Self {
            toolchain,
            source_dir: config.source_dir.clone(),
            output_dir: config.output_dir.clone(),
            logic_assembly: config.logic_assembly.clone(),
            source_extension: config.source_extension.clone(),
        })
    }

    /// Compile one source file into `<output_dir>/<stem>.js`.
    pub fn compile_source(&self, source: &Path) -> Result<PathBuf, ScriptError> {
        let stem = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.logic_assembly.clone());
        let output = self.output_path(&stem);
        self.run(&[source.to_path_buf()], &output)?;
        Ok(output)
    }

    /// Compile every source under the source directory into the logic assembly.
    pub fn compile_all_to_single(&self) -> Result<PathBuf, ScriptError> {
        let sources = collect_sources(&self.source_dir, &self.source_extension)?;
        let output = self.output_path(&self.logic_assembly);
        self.run(&sources, &output)?;
        Ok(output)
    }

    fn output_path(&self, stem: &str) -> PathBuf {
        self.output_dir
            .join(stem)
            .with_extension(ScriptConfig::ASSEMBLY_EXTENSION)
    }

    fn expand_args(&self, sources: &[PathBuf], output: &Path) -> Vec<String> {
        let output = output.to_string_lossy();
        let mut args = Vec::with_capacity(self.toolchain.args.len() + sources.len());
        for arg in &self.toolchain.args {
            if arg == "{sources}" {
                args.extend(sources.iter().map(|s| s.to_string_lossy().into_owned()));
            } else {
                args.push(arg.replace("{output}", &output));
            }
        }
        args
    }

    fn run(&self, sources: &[PathBuf], output: &Path) -> Result<(), ScriptError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| ScriptError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        let args = self.expand_args(sources, output);
        tracing::info!(
            "compiling {} script(s) with {} -> {}",
            sources.len(),
            self.toolchain.program,
            output.display()
        );
        let result = Command::new(&self.toolchain.program)
            .args(&args)
            .output()
            .map_err(|source| ScriptError::CompilerSpawn {
                program: self.toolchain.program.clone(),
                source,
            })?;

        if !result.status.success() {
            let mut text = String::from_utf8_lossy(&result.stderr).into_owned();
            text.push_str(&String::from_utf8_lossy(&result.stdout));
            tracing::error!("script compilation failed ({}): {}", result.status, text.trim());
            return Err(ScriptError::Compile {
                status: result.status.to_string(),
                output: text,
            });
        }
        Ok(())
    }
}

/// Source files under `dir` with `extension`, recursing into subdirectories,
/// sorted by path.
pub fn collect_sources(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, ScriptError> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = std::fs::read_dir(&current).map_err(|source| ScriptError::Io {
            path: current.clone(),
            source,
        })?;
        for entry in entries {
            let path = entry
                .map_err(|source| ScriptError::Io {
                    path: current.clone(),
                    source,
                })?
                .path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == extension) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}
