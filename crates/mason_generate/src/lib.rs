//! Generation passes: from a loaded project to build files on disk.
//!
//! A pass resolves the project's directive tree for one generator/platform
//! selection, aggregates the reached directives into a [`ProjectModel`],
//! hands the model to a [`Generator`] that renders files through
//! [`FileEmitter`](mason_emit::FileEmitter), and finally commits the build
//! cache. [`Plugin`]s add directives of their own and run before and after
//! the generator. Any failure rolls the cache back.

#![warn(missing_docs)]

pub mod cmake;
pub mod driver;
pub mod dummy;
pub mod error;
pub mod file2c;
pub mod generator;
pub mod model;
pub mod plugin;
pub mod tool;

pub use cmake::CMakeGenerator;
pub use driver::{host_platform, GeneratorDriver, PassOptions, PassReport};
pub use dummy::DummyGenerator;
pub use error::GenerateError;
pub use file2c::{Compression, EmbeddedFile, File2CDirective, File2CParser, File2CPlugin};
pub use generator::{GenerateContext, Generator, GeneratorRegistry};
pub use model::{ModelCollector, ProjectModel, SourceKind};
pub use plugin::{Plugin, PluginRegistry};
pub use tool::{run_tool, ToolCommand};
