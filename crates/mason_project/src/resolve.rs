//! Per-pass traversal of a [`DirectiveTree`].
//!
//! The [`Resolver`] walks scopes depth-first in directive order. Imports are
//! followed as if their directives were written inline; selectors are entered
//! only when their gate holds. Enumerations are resolved the moment their
//! declaration is reached, so a selector only sees enumerations declared
//! before it in traversal order.

use std::collections::BTreeMap;

use mason_cache::BuildCache;
use mason_common::Logger;
use serde::Serialize;

use crate::directive::Directive;
use crate::enumeration::Enumeration;
use crate::error::ConfigError;
use crate::scope::{DirectiveTree, Scope, ScopeId};

/// Prefix of the cache option keys holding persisted enumeration choices.
pub const ENUMERATION_OPTION_PREFIX: &str = "enum.";

/// Returns the cache option key for enumeration `id`.
pub fn enumeration_option_key(id: &str) -> String {
    format!("{ENUMERATION_OPTION_PREFIX}{id}")
}

/// Receives every directive reached during resolution.
///
/// `Import` and the selector kinds are consumed by the resolver itself; the
/// visitor receives the directives of the scopes they lead into instead.
pub trait DirectiveVisitor {
    /// Called once per reached directive, in traversal order. `scope` is the
    /// scope the directive was declared in.
    fn visit_directive(&mut self, scope: &Scope, directive: &Directive);
}

/// The active choices for one generation pass.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    /// Active generator name.
    pub generator: String,
    /// Active platform name.
    pub platform: String,
    /// Explicit enumeration values requested for this pass.
    pub overrides: BTreeMap<String, String>,
}

/// Where a resolved enumeration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// Explicit override for this pass.
    Override,
    /// Persisted by a previous pass.
    Cache,
    /// The declared default (or first value).
    Default,
}

/// A resolved enumeration value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedValue {
    /// The chosen value.
    pub value: String,
    /// Its origin.
    pub source: ValueSource,
}

/// Resolved value of each enumeration reached so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnumerationState {
    values: BTreeMap<String, ResolvedValue>,
}

impl EnumerationState {
    /// The value of enumeration `id`, if it has been resolved.
    pub fn get(&self, id: &str) -> Option<&str> {
        self.values.get(id).map(|v| v.value.as_str())
    }

    /// The value of enumeration `id` with its origin.
    pub fn resolved(&self, id: &str) -> Option<&ResolvedValue> {
        self.values.get(id)
    }

    /// Records a value.
    pub fn insert(&mut self, id: &str, value: &str, source: ValueSource) {
        self.values.insert(
            id.to_string(),
            ResolvedValue {
                value: value.to_string(),
                source,
            },
        );
    }

    /// Iterates `(id, value)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of resolved enumerations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing has been resolved.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Walks a [`DirectiveTree`] for one generation pass.
pub struct Resolver<'a> {
    tree: &'a DirectiveTree,
    context: &'a ResolveContext,
    cache: &'a mut BuildCache,
    logger: &'a dyn Logger,
    state: EnumerationState,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver with an empty enumeration state.
    ///
    /// Persisted choices are read from `cache` as enumerations are reached.
    pub fn new(
        tree: &'a DirectiveTree,
        context: &'a ResolveContext,
        cache: &'a mut BuildCache,
        logger: &'a dyn Logger,
    ) -> Self {
        Self {
            tree,
            context,
            cache,
            logger,
            state: EnumerationState::default(),
        }
    }

    /// Visits the directives of `scope` in order, reporting each reached
    /// directive to `visitor`.
    pub fn visit(
        &mut self,
        scope: ScopeId,
        visitor: &mut dyn DirectiveVisitor,
    ) -> Result<(), ConfigError> {
        let tree = self.tree;
        let current = tree.scope(scope);

        for directive in &current.directives {
            match directive {
                Directive::Import(inner) => self.visit(*inner, visitor)?,
                Directive::Selector(selector) => {
                    let entered = self
                        .state
                        .get(&selector.enumeration)
                        .is_some_and(|value| selector.matches(value));
                    if entered {
                        self.visit(selector.scope, visitor)?;
                    }
                }
                Directive::GeneratorSelector(branches) => {
                    if let Some(inner) = branches.select(&self.context.generator) {
                        self.visit(inner, visitor)?;
                    }
                }
                Directive::PlatformSelector(branches) => {
                    if let Some(inner) = branches.select(&self.context.platform) {
                        self.visit(inner, visitor)?;
                    }
                }
                Directive::RootProjectSelector { scope, active } => {
                    if *active {
                        self.visit(*scope, visitor)?;
                    }
                }
                Directive::Enumeration(enumeration) => {
                    self.resolve_enumeration(enumeration)?;
                    visitor.visit_directive(current, directive);
                }
                Directive::TargetName(_)
                | Directive::Define { .. }
                | Directive::HeaderPaths { .. }
                | Directive::SourceDirectories { .. }
                | Directive::SourceFiles { .. }
                | Directive::Plugin(_) => visitor.visit_directive(current, directive),
            }
        }
        Ok(())
    }

    /// Consumes the resolver, returning the final enumeration state.
    pub fn into_state(self) -> EnumerationState {
        self.state
    }

    /// Override ids that no reached enumeration declared.
    pub fn unused_overrides(&self) -> Vec<&str> {
        self.context
            .overrides
            .keys()
            .filter(|id| self.state.get(id).is_none())
            .map(String::as_str)
            .collect()
    }

    /// Fixes the value of `enumeration`: override, then persisted choice,
    /// then declared default.
    fn resolve_enumeration(&mut self, enumeration: &Enumeration) -> Result<(), ConfigError> {
        let id = enumeration.id.as_str();

        if let Some(value) = self.context.overrides.get(id) {
            if !enumeration.contains(value) {
                return Err(ConfigError::IllegalOverride {
                    id: id.to_string(),
                    value: value.clone(),
                });
            }
            self.state.insert(id, value, ValueSource::Override);
            return Ok(());
        }

        // Declared again in another entered branch: keep the first choice
        // while it stays legal.
        if self.state.get(id).is_some_and(|v| enumeration.contains(v)) {
            return Ok(());
        }

        if let Some(value) = self.cache.get_option(&enumeration_option_key(id)) {
            if enumeration.contains(&value) {
                self.state.insert(id, &value, ValueSource::Cache);
                return Ok(());
            }
            self.logger.debug(&format!(
                "ignoring stale value \"{value}\" for enumeration \"{id}\""
            ));
        }

        if let Some(value) = enumeration.fallback_value() {
            self.state.insert(id, value, ValueSource::Default);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::{BranchSelector, Selector};
    use mason_common::MemoryLogger;
    use std::path::Path;
    use std::sync::Arc;

    #[derive(Default)]
    struct Names(Vec<String>);

    impl DirectiveVisitor for Names {
        fn visit_directive(&mut self, _scope: &Scope, directive: &Directive) {
            match directive {
                Directive::TargetName(name) => self.0.push(name.clone()),
                Directive::Define { name, .. } => self.0.push(format!("-D{name}")),
                _ => {}
            }
        }
    }

    fn mode_enumeration() -> Enumeration {
        Enumeration {
            id: "mode".to_string(),
            title: "Build mode".to_string(),
            default: Some("debug".to_string()),
            values: vec![
                ("debug".to_string(), "Debug".to_string()),
                ("release".to_string(), "Release".to_string()),
            ],
        }
    }

    fn define(name: &str) -> Directive {
        Directive::Define {
            name: name.to_string(),
            value: None,
        }
    }

    /// root: enum mode; ^mode(release) { -DNDEBUG }
    fn selector_tree() -> DirectiveTree {
        let mut tree = DirectiveTree::new(Path::new("/p"));
        let root = tree.root();
        assert!(tree.reserve_enumeration_id(root, "mode"));
        tree.add_directive(root, Directive::Enumeration(mode_enumeration()));
        let inner = tree.add_scope(root, Path::new("/p"), false);
        tree.add_directive(inner, define("NDEBUG"));
        tree.add_directive(
            root,
            Directive::Selector(Selector {
                enumeration: "mode".to_string(),
                values: ["release".to_string()].into_iter().collect(),
                scope: inner,
            }),
        );
        tree
    }

    fn run(
        tree: &DirectiveTree,
        context: &ResolveContext,
        cache: &mut BuildCache,
    ) -> Result<(Vec<String>, EnumerationState), ConfigError> {
        let logger = MemoryLogger::new();
        let mut names = Names::default();
        let mut resolver = Resolver::new(tree, context, cache, &logger);
        resolver.visit(tree.root(), &mut names)?;
        Ok((names.0, resolver.into_state()))
    }

    fn make_cache() -> (tempfile::TempDir, BuildCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = BuildCache::new(dir.path(), Arc::new(MemoryLogger::new()));
        (dir, cache)
    }

    #[test]
    fn selector_follows_default() {
        let (_dir, mut cache) = make_cache();
        let tree = selector_tree();
        let (names, state) = run(&tree, &ResolveContext::default(), &mut cache).unwrap();
        assert!(names.is_empty());
        assert_eq!(state.get("mode"), Some("debug"));
        assert_eq!(state.resolved("mode").unwrap().source, ValueSource::Default);
    }

    #[test]
    fn selector_entered_on_override() {
        let (_dir, mut cache) = make_cache();
        let tree = selector_tree();
        let context = ResolveContext {
            overrides: [("mode".to_string(), "release".to_string())]
                .into_iter()
                .collect(),
            ..ResolveContext::default()
        };
        let (names, state) = run(&tree, &context, &mut cache).unwrap();
        assert_eq!(names, ["-DNDEBUG"]);
        assert_eq!(state.resolved("mode").unwrap().source, ValueSource::Override);
    }

    #[test]
    fn selector_entered_on_persisted_value() {
        let (_dir, mut cache) = make_cache();
        cache.set_option("enum.mode", "release");
        let tree = selector_tree();
        let (names, state) = run(&tree, &ResolveContext::default(), &mut cache).unwrap();
        assert_eq!(names, ["-DNDEBUG"]);
        assert_eq!(state.resolved("mode").unwrap().source, ValueSource::Cache);
    }

    #[test]
    fn stale_persisted_value_falls_back() {
        let (_dir, mut cache) = make_cache();
        cache.set_option("enum.mode", "profile");
        let tree = selector_tree();
        let (_, state) = run(&tree, &ResolveContext::default(), &mut cache).unwrap();
        assert_eq!(state.get("mode"), Some("debug"));
    }

    #[test]
    fn override_beats_persisted_value() {
        let (_dir, mut cache) = make_cache();
        cache.set_option("enum.mode", "release");
        let tree = selector_tree();
        let context = ResolveContext {
            overrides: [("mode".to_string(), "debug".to_string())]
                .into_iter()
                .collect(),
            ..ResolveContext::default()
        };
        let (names, _) = run(&tree, &context, &mut cache).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn illegal_override_errors() {
        let (_dir, mut cache) = make_cache();
        let tree = selector_tree();
        let context = ResolveContext {
            overrides: [("mode".to_string(), "profile".to_string())]
                .into_iter()
                .collect(),
            ..ResolveContext::default()
        };
        let err = run(&tree, &context, &mut cache).unwrap_err();
        assert!(matches!(err, ConfigError::IllegalOverride { .. }));
    }

    #[test]
    fn imports_are_visited_inline() {
        let (_dir, mut cache) = make_cache();
        let mut tree = DirectiveTree::new(Path::new("/p"));
        let root = tree.root();
        tree.add_directive(root, define("A"));
        let import = tree.add_scope(root, Path::new("/p/lib"), true);
        tree.add_directive(import, define("B"));
        tree.add_directive(root, Directive::Import(import));
        tree.add_directive(root, define("C"));

        let (names, _) = run(&tree, &ResolveContext::default(), &mut cache).unwrap();
        assert_eq!(names, ["-DA", "-DB", "-DC"]);
    }

    #[test]
    fn generator_selector_uses_branch_or_default() {
        let (_dir, mut cache) = make_cache();
        let mut tree = DirectiveTree::new(Path::new("/p"));
        let root = tree.root();
        let cmake = tree.add_scope(root, Path::new("/p"), false);
        tree.add_directive(cmake, define("CMAKE"));
        let fallback = tree.add_scope(root, Path::new("/p"), false);
        tree.add_directive(fallback, define("OTHER"));
        tree.add_directive(
            root,
            Directive::GeneratorSelector(BranchSelector {
                branches: vec![("cmake".to_string(), cmake)],
                default: Some(fallback),
            }),
        );

        let mut context = ResolveContext {
            generator: "cmake".to_string(),
            ..ResolveContext::default()
        };
        let (names, _) = run(&tree, &context, &mut cache).unwrap();
        assert_eq!(names, ["-DCMAKE"]);

        context.generator = "ninja".to_string();
        let (names, _) = run(&tree, &context, &mut cache).unwrap();
        assert_eq!(names, ["-DOTHER"]);
    }

    #[test]
    fn platform_selector_without_default_contributes_nothing() {
        let (_dir, mut cache) = make_cache();
        let mut tree = DirectiveTree::new(Path::new("/p"));
        let root = tree.root();
        let linux = tree.add_scope(root, Path::new("/p"), false);
        tree.add_directive(linux, define("LINUX"));
        tree.add_directive(
            root,
            Directive::PlatformSelector(BranchSelector {
                branches: vec![("linux".to_string(), linux)],
                default: None,
            }),
        );

        let context = ResolveContext {
            platform: "windows".to_string(),
            ..ResolveContext::default()
        };
        let (names, _) = run(&tree, &context, &mut cache).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn root_project_selector_gated_by_declaring_file() {
        let (_dir, mut cache) = make_cache();
        let mut tree = DirectiveTree::new(Path::new("/p"));
        let root = tree.root();
        let lib = tree.add_scope(root, Path::new("/p/lib"), true);
        tree.add_directive(root, Directive::Import(lib));

        for (scope, active, name) in [(root, true, "ROOT"), (lib, false, "LIB")] {
            let inner = tree.add_scope(scope, Path::new("/p"), false);
            tree.add_directive(inner, define(name));
            tree.add_directive(scope, Directive::RootProjectSelector { scope: inner, active });
        }

        let (names, _) = run(&tree, &ResolveContext::default(), &mut cache).unwrap();
        assert_eq!(names, ["-DROOT"]);
    }

    #[test]
    fn selector_before_declaration_contributes_nothing() {
        let (_dir, mut cache) = make_cache();
        let mut tree = DirectiveTree::new(Path::new("/p"));
        let root = tree.root();
        let inner = tree.add_scope(root, Path::new("/p"), false);
        tree.add_directive(inner, define("EARLY"));
        tree.add_directive(
            root,
            Directive::Selector(Selector {
                enumeration: "mode".to_string(),
                values: ["debug".to_string()].into_iter().collect(),
                scope: inner,
            }),
        );
        tree.add_directive(root, Directive::Enumeration(mode_enumeration()));

        let (names, state) = run(&tree, &ResolveContext::default(), &mut cache).unwrap();
        assert!(names.is_empty());
        assert_eq!(state.get("mode"), Some("debug"));
    }

    #[test]
    fn unused_overrides_are_reported() {
        let (_dir, mut cache) = make_cache();
        let tree = selector_tree();
        let context = ResolveContext {
            overrides: [("arch".to_string(), "x64".to_string())]
                .into_iter()
                .collect(),
            ..ResolveContext::default()
        };
        let logger = MemoryLogger::new();
        let mut resolver = Resolver::new(&tree, &context, &mut cache, &logger);
        resolver.visit(tree.root(), &mut Names::default()).unwrap();
        assert_eq!(resolver.unused_overrides(), ["arch"]);
    }
}
