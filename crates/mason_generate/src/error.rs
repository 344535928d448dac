//! Error type for generation passes.

use std::path::PathBuf;

use mason_cache::CacheError;
use mason_emit::{EmitError, TemplateError};
use mason_project::ConfigError;

/// Every failure that aborts a generation pass.
///
/// The `Display` text is a one-line summary; the chain of
/// [`source`](std::error::Error::source) errors carries the detail.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The project description is invalid for this pass.
    #[error("configuration error")]
    Config(#[from] ConfigError),

    /// The build cache could not be committed.
    #[error("build cache error")]
    Cache(#[from] CacheError),

    /// A generated file could not be written.
    #[error("unable to emit generated file")]
    Emit(#[from] EmitError),

    /// A template referenced an undeclared variable.
    #[error("template error")]
    Template(#[from] TemplateError),

    /// No generator with the requested name is registered.
    #[error("unknown generator \"{name}\" (available: {})", available.join(", "))]
    UnknownGenerator {
        /// The requested name.
        name: String,
        /// Registered generator names.
        available: Vec<String>,
    },

    /// Enumerating a source directory failed.
    #[error("unable to enumerate \"{}\"", path.display())]
    SourceEnumeration {
        /// The directory being walked.
        path: PathBuf,
        /// The underlying walk error.
        source: walkdir::Error,
    },

    /// A plugin could not read or produce a file.
    #[error("plugin \"{plugin}\" failed on \"{}\"", path.display())]
    Plugin {
        /// The plugin name.
        plugin: String,
        /// The file being processed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An external tool could not be started or exited unsuccessfully.
    #[error("{tool} failed: {reason}")]
    ToolInvocation {
        /// The program name.
        tool: String,
        /// Spawn error or exit status.
        reason: String,
    },
}
