//! The generator interface and registry.

use std::path::{Path, PathBuf};

use mason_cache::BuildCache;
use mason_common::Logger;
use mason_emit::FileEmitter;
use mason_project::Project;

use crate::cmake::CMakeGenerator;
use crate::dummy::DummyGenerator;
use crate::error::GenerateError;
use crate::model::ProjectModel;
use crate::tool::ToolCommand;

/// Produces build files for one build tool from a [`ProjectModel`].
pub trait Generator: Send + Sync {
    /// Name used on the command line and in `+generator` branches.
    fn name(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str;

    /// Writes the generated files through `context`.
    fn generate(&self, context: &mut GenerateContext<'_>) -> Result<(), GenerateError>;

    /// The command that builds or configures the generated output, if the
    /// generator has one.
    fn build_command(&self, _output_directory: &Path) -> Option<ToolCommand> {
        None
    }
}

/// What a generator sees during one pass.
pub struct GenerateContext<'a> {
    project: &'a Project,
    model: &'a ProjectModel,
    output_directory: PathBuf,
    cache: &'a mut BuildCache,
    logger: &'a dyn Logger,
    written: Vec<PathBuf>,
    kept: Vec<PathBuf>,
    generated: Vec<PathBuf>,
}

impl<'a> GenerateContext<'a> {
    /// Creates a context writing below `output_directory`.
    pub fn new(
        project: &'a Project,
        model: &'a ProjectModel,
        output_directory: PathBuf,
        cache: &'a mut BuildCache,
        logger: &'a dyn Logger,
    ) -> Self {
        Self {
            project,
            model,
            output_directory,
            cache,
            logger,
            written: Vec::new(),
            kept: Vec::new(),
            generated: Vec::new(),
        }
    }

    /// The project being generated.
    pub fn project(&self) -> &'a Project {
        self.project
    }

    /// The aggregated project model.
    pub fn model(&self) -> &'a ProjectModel {
        self.model
    }

    /// Directory generated files go to.
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// The logging handle for this pass.
    pub fn logger(&self) -> &'a dyn Logger {
        self.logger
    }

    /// The build cache of this pass, for plugins tracking their own inputs.
    pub fn cache(&mut self) -> &mut BuildCache {
        self.cache
    }

    /// Registers a file produced before generation so the generator builds
    /// it along with the project's own sources.
    pub fn add_generated_file(&mut self, path: PathBuf) {
        self.generated.push(path);
    }

    /// Files registered through [`add_generated_file`](Self::add_generated_file).
    pub fn generated_files(&self) -> &[PathBuf] {
        &self.generated
    }

    /// Commits one generated file and records whether it was written.
    pub fn commit(&mut self, emitter: &FileEmitter) -> Result<bool, GenerateError> {
        let written = emitter.commit(self.cache, self.logger)?;
        if written {
            self.written.push(emitter.path().to_path_buf());
        } else {
            self.kept.push(emitter.path().to_path_buf());
        }
        Ok(written)
    }

    /// Consumes the context, returning `(written, kept)` file lists.
    pub fn into_outcome(self) -> (Vec<PathBuf>, Vec<PathBuf>) {
        (self.written, self.kept)
    }
}

/// Generators available to a driver, in registration order.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: Vec<Box<dyn Generator>>,
}

impl GeneratorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in generators.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CMakeGenerator));
        registry.register(Box::new(DummyGenerator));
        registry
    }

    /// Adds a generator. Lookups return the first one registered under a
    /// given name.
    pub fn register(&mut self, generator: Box<dyn Generator>) {
        self.generators.push(generator);
    }

    /// Looks up a generator by name.
    pub fn get(&self, name: &str) -> Result<&dyn Generator, GenerateError> {
        self.generators
            .iter()
            .find(|g| g.name() == name)
            .map(|g| g.as_ref())
            .ok_or_else(|| GenerateError::UnknownGenerator {
                name: name.to_string(),
                available: self.names().map(str::to_string).collect(),
            })
    }

    /// Registered generator names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.generators.iter().map(|g| g.name())
    }

    /// Registered generators.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Generator> {
        self.generators.iter().map(|g| g.as_ref())
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
