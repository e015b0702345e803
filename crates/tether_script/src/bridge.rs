use crate::compiler::ScriptCompiler;
use crate::config::ScriptConfig;
use crate::error::ScriptError;
use crate::host::ManagedHost;
use std::path::PathBuf;

/// Owns the build side of hot reload and drives a host through a reload.
pub struct ScriptBridge {
    config: ScriptConfig,
    compiler: Option<ScriptCompiler>,
}

impl ScriptBridge {
    pub fn new(config: ScriptConfig) -> Self {
        let compiler = ScriptCompiler::from_config(&config);
        Self { config, compiler }
    }

    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    pub fn has_compiler(&self) -> bool {
        self.compiler.is_some()
    }

    /// Build the logic assembly. `Ok(None)` when no toolchain is configured
    /// and the output directory is used as-is.
    pub fn compile(&self) -> Result<Option<PathBuf>, ScriptError> {
        match &self.compiler {
            Some(compiler) => compiler.compile_all_to_single().map(Some),
            None => Ok(None),
        }
    }

    /// Swap in a fresh secondary domain and load everything in the output
    /// directory. Returns the number of loaded assemblies.
    pub fn reload<H: ManagedHost + ?Sized>(&self, host: &mut H) -> Result<usize, ScriptError> {
        host.unload_secondary_domain();
        host.load_secondary_domain()?;
        host.reload_all()
    }

    /// Compile, then reload only if the build succeeded.
    pub fn hot_reload<H: ManagedHost + ?Sized>(&self, host: &mut H) -> Result<usize, ScriptError> {
        if let Err(err) = self.compile() {
            tracing::error!("hot reload aborted, keeping loaded scripts: {}", err);
            return Err(err);
        }
        self.reload(host)
    }
}
