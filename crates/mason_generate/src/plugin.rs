//! Plugins: extra directives plus hooks around generation.

use mason_project::{DirectiveParser, ProjectLoader};

use crate::error::GenerateError;
use crate::file2c::File2CPlugin;
use crate::generator::GenerateContext;

/// Extends the loader with directives and the pass with hooks.
///
/// Both hooks receive a [`GenerateContext`] sharing the pass's build cache,
/// so anything they commit is covered by the same transaction as the
/// generator's own files.
pub trait Plugin: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Parser for the directives this plugin adds, if any.
    fn directive_parser(&self) -> Option<Box<dyn DirectiveParser>> {
        None
    }

    /// Runs after the project is resolved and before the generator.
    ///
    /// Files registered with [`GenerateContext::add_generated_file`] become
    /// part of the model the generator sees.
    fn pre_generate(&self, _context: &mut GenerateContext<'_>) -> Result<(), GenerateError> {
        Ok(())
    }

    /// Runs after the generator has written its files.
    fn post_generate(&self, _context: &mut GenerateContext<'_>) -> Result<(), GenerateError> {
        Ok(())
    }
}

/// Plugins active in a driver, in registration order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in plugins.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(File2CPlugin));
        registry
    }

    /// Adds a plugin. Hooks run in registration order.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// Registered plugin names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|p| p.name())
    }

    /// Registered plugins.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.iter().map(|p| p.as_ref())
    }

    /// A project loader that understands every registered plugin's
    /// directives.
    pub fn loader(&self) -> ProjectLoader {
        self.plugins
            .iter()
            .filter_map(|p| p.directive_parser())
            .fold(ProjectLoader::new(), ProjectLoader::with_parser)
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mason_project::ConfigError;

    struct Silent;

    impl Plugin for Silent {
        fn name(&self) -> &str {
            "silent"
        }
    }

    #[test]
    fn builtin_plugins() {
        let registry = PluginRegistry::with_builtin();
        assert_eq!(registry.names().collect::<Vec<_>>(), ["file2c"]);
        assert_eq!(format!("{registry:?}"), "[\"file2c\"]");
    }

    #[test]
    fn loader_accepts_plugin_directives() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blob.bin"), [1u8, 2, 3]).unwrap();
        let source = "[file2c]\ninput = \"blob.bin\"\noutput = \"blob.c\"\nidentifier = \"blob\"\n";

        let err = PluginRegistry::new()
            .loader()
            .load_from_str(dir.path(), source)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDirective { .. }));

        PluginRegistry::with_builtin()
            .loader()
            .load_from_str(dir.path(), source)
            .unwrap();
    }

    #[test]
    fn plugin_without_parser_or_hooks() {
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(Silent));
        assert!(registry.iter().all(|p| p.directive_parser().is_none()));
        let dir = tempfile::tempdir().unwrap();
        registry
            .loader()
            .load_from_str(dir.path(), "target_name = \"X\"")
            .unwrap();
    }
}
