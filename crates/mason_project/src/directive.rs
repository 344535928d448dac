//! The closed set of directive kinds plus a plugin extension point.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::enumeration::Enumeration;
use crate::scope::ScopeId;

/// One configuration statement inside a [`Scope`](crate::Scope).
///
/// Consumers match on this exhaustively. The structural kinds (`Import` and
/// the four selectors) are interpreted by the [`Resolver`](crate::Resolver)
/// and never reach a visitor directly; their inner scopes do.
#[derive(Debug)]
pub enum Directive {
    /// Directives of another project file, visited inline.
    Import(ScopeId),
    /// Name of the build target.
    TargetName(String),
    /// A preprocessor definition, `NAME` or `NAME=value`.
    Define {
        /// Macro name.
        name: String,
        /// Optional macro value.
        value: Option<String>,
    },
    /// Include search paths.
    HeaderPaths {
        /// Canonical directories.
        paths: Vec<PathBuf>,
        /// Whether these belong to third-party code.
        thirdparty: bool,
    },
    /// Directories whose files are enumerated recursively.
    SourceDirectories {
        /// Canonical directories.
        directories: Vec<PathBuf>,
        /// Whether these belong to third-party code.
        thirdparty: bool,
    },
    /// Individually listed source files.
    SourceFiles {
        /// Canonical file paths.
        files: Vec<PathBuf>,
        /// Whether these belong to third-party code.
        thirdparty: bool,
    },
    /// Declaration of a user-facing choice.
    Enumeration(Enumeration),
    /// Branch gated on an enumeration value.
    Selector(Selector),
    /// Branches gated on the active generator.
    GeneratorSelector(BranchSelector),
    /// Branches gated on the active platform.
    PlatformSelector(BranchSelector),
    /// Entered only when declared in the root project file itself, not in a
    /// file reached through `import`.
    RootProjectSelector {
        /// The gated scope.
        scope: ScopeId,
        /// Whether the declaring file was the root project file.
        active: bool,
    },
    /// A directive contributed by a plugin parser. Shared so passes can hand
    /// it to plugins without borrowing the tree.
    Plugin(Arc<dyn PluginDirective>),
}

/// Enters `scope` when `enumeration` resolves to one of `values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// The gating enumeration id.
    pub enumeration: String,
    /// Matching values.
    pub values: BTreeSet<String>,
    /// The gated scope.
    pub scope: ScopeId,
}

impl Selector {
    /// Returns `true` if `value` is in the match set.
    pub fn matches(&self, value: &str) -> bool {
        self.values.contains(value)
    }
}

/// Named branches with an optional fallback, used for generator and platform
/// selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchSelector {
    /// Branches in declaration order.
    pub branches: Vec<(String, ScopeId)>,
    /// Scope entered when no branch name matches.
    pub default: Option<ScopeId>,
}

impl BranchSelector {
    /// Returns the scope to enter for the active `name`, if any.
    ///
    /// The first branch with a matching name wins; otherwise the default
    /// branch is used.
    pub fn select(&self, name: &str) -> Option<ScopeId> {
        self.branches
            .iter()
            .find(|(branch, _)| branch == name)
            .map(|(_, scope)| *scope)
            .or(self.default)
    }
}

/// A directive defined outside this crate.
///
/// Plugins register a [`DirectiveParser`](crate::DirectiveParser) with the
/// loader; what it produces is stored as [`Directive::Plugin`] and handed to
/// visitors like any other directive. Visitors recover the concrete type via
/// [`as_any`](Self::as_any).
pub trait PluginDirective: fmt::Debug + Send + Sync {
    /// The directive key this was parsed from.
    fn key(&self) -> &str;

    /// Access to the concrete type.
    fn as_any(&self) -> &dyn Any;
}
