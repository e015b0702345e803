use std::path::PathBuf;
use thiserror::Error;

/// Failures of bridge operations (loading, compiling, instantiating).
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script runtime error: {0}")]
    Runtime(#[from] rquickjs::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no secondary domain is loaded")]
    NoDomain,

    #[error("assembly '{0}' is already loaded")]
    DuplicateAssembly(String),

    #[error("failed to load assembly '{name}': {reason}")]
    AssemblyLoad { name: String, reason: String },

    #[error("assembly '{0}' is not loaded")]
    AssemblyNotLoaded(String),

    #[error("class '{class}' not found in assembly '{assembly}'")]
    ClassNotFound { assembly: String, class: String },

    #[error("failed to construct '{class}': {message}")]
    Construct { class: String, message: String },

    #[error("failed to start compiler '{program}': {source}")]
    CompilerSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compiler exited with {status}: {output}")]
    Compile { status: String, output: String },
}

/// Outcome of a failed `invoke`, so callers can branch on the cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptFault {
    #[error("no secondary domain is loaded")]
    NoDomain,

    #[error("object handle belongs to an unloaded domain or was collected")]
    StaleHandle,

    #[error("{class}.{method} has not been resolved since the last reload")]
    Unresolved { class: String, method: String },

    #[error("{class}.{method} threw: {message}")]
    Exception {
        class: String,
        method: String,
        message: String,
    },
}
