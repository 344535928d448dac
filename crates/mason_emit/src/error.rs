//! Error types for templates and file emission.

use std::path::PathBuf;

/// Errors raised while rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// The template references a variable the caller did not supply.
    #[error("template references undeclared variable \"{name}\"")]
    UndeclaredVariable {
        /// The variable name inside `@{...}`.
        name: String,
    },
}

/// Errors raised while committing a generated file.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// Rendering the file's template failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Creating the parent directory or writing the file failed.
    #[error("unable to write file \"{}\": {source}", path.display())]
    Io {
        /// The file or directory being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
