//! Error types for project loading and resolution.

use std::path::PathBuf;

/// A fatal configuration problem.
///
/// Raised while loading a project description or while resolving it for a
/// generation pass. Every variant aborts the pass before the build cache is
/// committed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A project file could not be read.
    #[error("failed to read \"{}\": {source}", path.display())]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A project file is not valid TOML.
    #[error("failed to parse \"{}\": {reason}", path.display())]
    Parse {
        /// The file being parsed.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A project directory has no project file.
    #[error("project file \"{}\" does not exist", path.display())]
    MissingProjectFile {
        /// The expected project file path.
        path: PathBuf,
    },

    /// A source directory does not exist or is not a directory.
    #[error("directory \"{}\" does not exist or is not a directory (in \"{}\")", path.display(), file.display())]
    MissingDirectory {
        /// The project file declaring the directory.
        file: PathBuf,
        /// The offending directory.
        path: PathBuf,
    },

    /// A key is neither a built-in directive nor accepted by any plugin.
    #[error("unknown directive \"{key}\" in \"{}\"", file.display())]
    UnknownDirective {
        /// The project file.
        file: PathBuf,
        /// The unrecognized key.
        key: String,
    },

    /// A directive value has the wrong shape.
    #[error("invalid value for \"{key}\" in \"{}\": {reason}", file.display())]
    InvalidValue {
        /// The project file.
        file: PathBuf,
        /// The directive key.
        key: String,
        /// What was expected.
        reason: String,
    },

    /// A target name contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid target name \"{name}\" in \"{}\"", file.display())]
    InvalidTargetName {
        /// The project file.
        file: PathBuf,
        /// The rejected name.
        name: String,
    },

    /// An enumeration id is already reserved in the visible scope chain.
    #[error("duplicate enumeration \"{id}\" in \"{}\"", file.display())]
    DuplicateEnumeration {
        /// The project file.
        file: PathBuf,
        /// The duplicated id.
        id: String,
    },

    /// A selector names an enumeration that is not declared in its scope chain.
    #[error("selector references undeclared enumeration \"{id}\" in \"{}\"", file.display())]
    UndeclaredEnumeration {
        /// The project file.
        file: PathBuf,
        /// The referenced id.
        id: String,
    },

    /// A selector lists a value its enumeration does not declare.
    #[error("enumeration \"{id}\" has no value \"{value}\" (in \"{}\")", file.display())]
    IllegalSelectorValue {
        /// The project file.
        file: PathBuf,
        /// The enumeration id.
        id: String,
        /// The rejected value.
        value: String,
    },

    /// A selector key is malformed.
    #[error("malformed selector \"{key}\" in \"{}\"", file.display())]
    InvalidSelector {
        /// The project file.
        file: PathBuf,
        /// The offending key.
        key: String,
    },

    /// A user override names a value the enumeration does not declare.
    #[error("illegal value \"{value}\" for enumeration \"{id}\"")]
    IllegalOverride {
        /// The enumeration id.
        id: String,
        /// The rejected value.
        value: String,
    },
}
