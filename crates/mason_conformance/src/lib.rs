//! Conformance test helpers for Mason.
//!
//! Provides a [`Fixture`] that lays out a project tree in a temporary
//! directory, plus shortcuts to resolve it into a [`ProjectModel`] or run a
//! full generation pass with an in-memory logger.

#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mason_cache::BuildCache;
use mason_common::{Logger, MemoryLogger};
use mason_generate::{
    GenerateError, GeneratorDriver, ModelCollector, PassOptions, PassReport, PluginRegistry,
    ProjectModel,
};
use mason_project::{
    ConfigError, EnumerationState, Project, ResolveContext, Resolver, PROJECT_FILE_NAME,
};
use tempfile::TempDir;

/// A small C++ project exercising enumerations, selectors and imports.
///
/// Layout written by [`Fixture::sample`]:
///
/// ```text
/// project.toml
/// src/main.cpp
/// src/main.h
/// lib/project.toml
/// lib/lib.cpp
/// ```
pub const SAMPLE_PROJECT: &str = r#"
target_name = "sample"
define = ["SAMPLE"]
import = ["lib"]
source_directories = ["src"]

[enum.mode]
title = "Build mode"
default = "debug"
values = { debug = "Debug", release = "Release" }

["^mode(release)"]
define = ["NDEBUG"]

["^mode(debug)"]
define = ["SAMPLE_DEBUG=1"]

["+generator"."+cmake"]
define = ["USING_CMAKE"]

["+platform"."+windows"]
define = ["WIN32_LEAN_AND_MEAN"]

["+platform"."+default"]
define = ["POSIX"]
"#;

const SAMPLE_LIB: &str = r#"
source_files = ["lib.cpp"]
header_search_paths = ["."]
"#;

/// A project laid out in a temporary directory that lives as long as the
/// fixture.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    /// An empty project directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// A fixture with `project.toml` set to `content`.
    pub fn with_project(content: &str) -> Self {
        let fixture = Self::new();
        fixture.write(PROJECT_FILE_NAME, content);
        fixture
    }

    /// The [`SAMPLE_PROJECT`] layout.
    pub fn sample() -> Self {
        let fixture = Self::with_project(SAMPLE_PROJECT);
        fixture.write("src/main.cpp", "int main() { return 0; }\n");
        fixture.write("src/main.h", "#pragma once\n");
        fixture.write("lib/project.toml", SAMPLE_LIB);
        fixture.write("lib/lib.cpp", "void lib() {}\n");
        fixture
    }

    /// The project directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Reads `relative` as text.
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.dir.path().join(relative)).unwrap()
    }

    /// Loads the project with the built-in plugins, returning the
    /// configuration error if any.
    pub fn try_load(&self) -> Result<Project, ConfigError> {
        PluginRegistry::with_builtin().loader().load(self.dir.path())
    }

    /// Loads the project, panicking on configuration errors.
    pub fn load(&self) -> Project {
        match self.try_load() {
            Ok(project) => project,
            Err(e) => panic!("failed to load fixture project: {e}"),
        }
    }

    /// A cache handle on the project's build directory.
    pub fn cache(&self, logger: Arc<dyn Logger>) -> BuildCache {
        BuildCache::new(&self.dir.path().join(mason_project::BUILD_DIRECTORY_NAME), logger)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of resolving a project without generating anything.
pub struct Resolution {
    /// The aggregated model.
    pub model: ProjectModel,
    /// Resolved enumeration values.
    pub selections: EnumerationState,
}

/// Resolves `project` for `generator`/`platform`, reading persisted values
/// from its cache but never committing.
pub fn resolve(
    project: &Project,
    generator: &str,
    platform: &str,
    overrides: &[(&str, &str)],
) -> Result<Resolution, GenerateError> {
    let logger = Arc::new(MemoryLogger::new());
    let mut cache = BuildCache::new(&project.build_directory(), logger.clone());
    let context = ResolveContext {
        generator: generator.to_string(),
        platform: platform.to_string(),
        overrides: overrides
            .iter()
            .map(|(id, value)| (id.to_string(), value.to_string()))
            .collect::<BTreeMap<_, _>>(),
    };

    let mut collector = ModelCollector::new().exclude_directory(&project.build_directory());
    let result = {
        let mut resolver = Resolver::new(project.tree(), &context, &mut cache, logger.as_ref());
        resolver
            .visit(project.tree().root(), &mut collector)
            .map(|()| resolver.into_state())
    };
    cache.rollback_safe();

    let selections = result?;
    Ok(Resolution {
        model: collector.finish()?,
        selections,
    })
}

/// Runs one pass with a fresh [`MemoryLogger`], returning the logger too.
pub fn run_pass(
    project: &Project,
    options: &PassOptions,
) -> (Result<PassReport, GenerateError>, Arc<MemoryLogger>) {
    let logger = Arc::new(MemoryLogger::new());
    let driver = GeneratorDriver::new(logger.clone());
    (driver.run(project, options), logger)
}

/// Options selecting `generator` with everything else defaulted.
pub fn options_for(generator: &str) -> PassOptions {
    PassOptions {
        generator: Some(generator.to_string()),
        ..PassOptions::default()
    }
}
