//! One complete generation pass, wrapped in a cache transaction.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use mason_cache::BuildCache;
use mason_common::Logger;
use mason_project::{
    enumeration_option_key, EnumerationState, Project, ResolveContext, Resolver,
};
use serde::Serialize;

use crate::error::GenerateError;
use crate::generator::{GenerateContext, Generator, GeneratorRegistry};
use crate::model::ModelCollector;
use crate::plugin::PluginRegistry;
use crate::tool::run_tool;

/// Generator used when none is requested or remembered.
pub const DEFAULT_GENERATOR: &str = "cmake";

/// Cache option holding the last generator.
pub const GENERATOR_OPTION: &str = "generator";

/// Cache option holding the last platform.
pub const PLATFORM_OPTION: &str = "platform";

/// Name of the platform this process runs on (`linux`, `macos`, `windows`, ...).
pub fn host_platform() -> &'static str {
    std::env::consts::OS
}

/// Choices for one generation pass.
///
/// Unset generator and platform fall back to the values remembered by the
/// previous pass, then to [`DEFAULT_GENERATOR`] and [`host_platform`].
#[derive(Debug, Clone, Default)]
pub struct PassOptions {
    /// Generator name.
    pub generator: Option<String>,
    /// Platform name.
    pub platform: Option<String>,
    /// Explicit enumeration values.
    pub overrides: BTreeMap<String, String>,
    /// Run the generator's build command after writing files.
    pub run_build_tool: bool,
}

/// Outcome of a successful pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    /// Generator used.
    pub generator: String,
    /// Platform used.
    pub platform: String,
    /// Resolved target name.
    pub target_name: String,
    /// Resolved enumeration values.
    pub selections: EnumerationState,
    /// Where generated files went.
    pub output_directory: PathBuf,
    /// Project files that changed since the previous pass (or whose
    /// selection changed).
    pub changed_inputs: Vec<PathBuf>,
    /// Files written in this pass.
    pub written: Vec<PathBuf>,
    /// Files left untouched because their content was unchanged.
    pub kept: Vec<PathBuf>,
}

/// Runs generation passes with fixed generator and plugin registries.
pub struct GeneratorDriver {
    registry: GeneratorRegistry,
    plugins: PluginRegistry,
    logger: Arc<dyn Logger>,
}

impl GeneratorDriver {
    /// A driver with the built-in generators and plugins.
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self::with_registry(GeneratorRegistry::with_builtin(), logger)
    }

    /// A driver with a custom generator registry and the built-in plugins.
    pub fn with_registry(registry: GeneratorRegistry, logger: Arc<dyn Logger>) -> Self {
        Self {
            registry,
            plugins: PluginRegistry::with_builtin(),
            logger,
        }
    }

    /// Replaces the plugins.
    pub fn with_plugins(mut self, plugins: PluginRegistry) -> Self {
        self.plugins = plugins;
        self
    }

    /// The generators this driver can run.
    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    /// The plugins hooked into every pass. Projects should be loaded with
    /// [`PluginRegistry::loader`] so their directives are understood.
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Runs one pass over `project`.
    ///
    /// The build cache in `<project>/.build` is committed only if every step
    /// succeeds; otherwise it is rolled back and the error returned. Files
    /// already written by the failed pass stay on disk, and since their hashes
    /// were not committed the next pass writes them again.
    pub fn run(&self, project: &Project, options: &PassOptions) -> Result<PassReport, GenerateError> {
        let mut cache = BuildCache::new(&project.build_directory(), self.logger.clone());
        let result = self
            .run_pass(project, options, &mut cache)
            .and_then(|report| {
                cache.commit()?;
                Ok(report)
            });

        if result.is_err() {
            cache.rollback_safe();
        }
        result
    }

    fn run_pass(
        &self,
        project: &Project,
        options: &PassOptions,
        cache: &mut BuildCache,
    ) -> Result<PassReport, GenerateError> {
        let logger = self.logger.as_ref();
        let generator = self.select_generator(options, cache)?;
        let platform = match &options.platform {
            Some(platform) => platform.clone(),
            None => cache
                .get_option(PLATFORM_OPTION)
                .unwrap_or_else(|| host_platform().to_string()),
        };

        logger.debug("=== Resolving the project");
        let context = ResolveContext {
            generator: generator.name().to_string(),
            platform: platform.clone(),
            overrides: options.overrides.clone(),
        };
        let mut collector = ModelCollector::new().exclude_directory(&project.build_directory());
        let selections = {
            let mut resolver = Resolver::new(project.tree(), &context, cache, logger);
            resolver.visit(project.tree().root(), &mut collector)?;
            for id in resolver.unused_overrides() {
                logger.warn(&format!("ignoring value for unknown enumeration \"{id}\""));
            }
            resolver.into_state()
        };
        let mut model = collector.finish()?;

        for (id, resolved) in selections.iter() {
            cache.set_option(&enumeration_option_key(id), &resolved.value);
        }
        cache.set_option(GENERATOR_OPTION, generator.name());
        cache.set_option(PLATFORM_OPTION, &platform);

        let metadata = selection_fingerprint(generator.name(), &platform, &selections);
        let mut changed_inputs = Vec::new();
        for file in project.files() {
            if cache.did_input_file_change(file, metadata.as_bytes()) {
                logger.debug(&format!("input changed: {}", file.display()));
                changed_inputs.push(file.clone());
            }
        }

        let output_directory = project.build_directory().join(generator.name());

        logger.debug("=== Pre-generate phase");
        let mut plugin_context =
            GenerateContext::new(project, &model, output_directory.clone(), cache, logger);
        for plugin in self.plugins.iter() {
            plugin.pre_generate(&mut plugin_context)?;
        }
        let generated = plugin_context.generated_files().to_vec();
        let (mut written, mut kept) = plugin_context.into_outcome();
        for file in generated {
            if !model.add_generated_file(file.clone()) {
                logger.trace(&format!("not compiling generated file {}", file.display()));
            }
        }

        logger.debug("=== Generating build files");
        let mut generate_context =
            GenerateContext::new(project, &model, output_directory.clone(), cache, logger);
        generator.generate(&mut generate_context)?;

        logger.debug("=== Post-generate phase");
        for plugin in self.plugins.iter() {
            plugin.post_generate(&mut generate_context)?;
        }
        let (generator_written, generator_kept) = generate_context.into_outcome();
        written.extend(generator_written);
        kept.extend(generator_kept);

        if options.run_build_tool {
            match generator.build_command(&output_directory) {
                Some(command) => {
                    logger.debug("=== Running the build tool");
                    run_tool(&command, logger)?;
                }
                None => logger.warn(&format!(
                    "generator \"{}\" has no build tool",
                    generator.name()
                )),
            }
        }

        logger.info(&format!(
            "{}: {} written, {} unchanged",
            generator.name(),
            written.len(),
            kept.len()
        ));

        Ok(PassReport {
            generator: generator.name().to_string(),
            platform,
            target_name: model.target_name,
            selections,
            output_directory,
            changed_inputs,
            written,
            kept,
        })
    }

    /// Explicit choice, else the remembered one if still registered, else the
    /// default.
    fn select_generator(
        &self,
        options: &PassOptions,
        cache: &mut BuildCache,
    ) -> Result<&dyn Generator, GenerateError> {
        if let Some(name) = &options.generator {
            return self.registry.get(name);
        }
        if let Some(name) = cache.get_option(GENERATOR_OPTION) {
            match self.registry.get(&name) {
                Ok(generator) => return Ok(generator),
                Err(_) => self
                    .logger
                    .debug(&format!("remembered generator \"{name}\" is not available")),
            }
        }
        self.registry.get(DEFAULT_GENERATOR)
    }
}

impl std::fmt::Debug for GeneratorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorDriver")
            .field("registry", &self.registry)
            .field("plugins", &self.plugins)
            .finish()
    }
}

/// Serializes the pass selection; it becomes the extra metadata of every
/// project-file staleness check, so changing the selection marks all project
/// files as changed.
fn selection_fingerprint(generator: &str, platform: &str, selections: &EnumerationState) -> String {
    let mut out = format!("generator={generator}\nplatform={platform}\n");
    for (id, resolved) in selections.iter() {
        out.push_str(&format!("{}={}\n", enumeration_option_key(id), resolved.value));
    }
    out
}
