//! Project description model and conditional resolution.
//!
//! A project is loaded from `project.toml` files into a [`DirectiveTree`]: an
//! arena of nested [`Scope`]s holding ordered [`Directive`]s. Load-time
//! invariants (enumeration id uniqueness, selector validity, known directive
//! keys) are enforced by the [`ProjectLoader`]. A [`Resolver`] then walks the
//! tree once per generation pass, following imports transparently and
//! entering selector branches only when their condition holds, and reports
//! every reached directive to a [`DirectiveVisitor`].

#![warn(missing_docs)]

pub mod directive;
pub mod enumeration;
pub mod error;
pub mod loader;
pub mod project;
pub mod resolve;
pub mod scope;

pub use directive::{BranchSelector, Directive, PluginDirective, Selector};
pub use enumeration::{is_identifier, Enumeration};
pub use error::ConfigError;
pub use loader::{DirectiveParser, ProjectLoader, PROJECT_FILE_NAME};
pub use project::{Project, BUILD_DIRECTORY_NAME};
pub use resolve::{
    enumeration_option_key, DirectiveVisitor, EnumerationState, ResolveContext, ResolvedValue,
    Resolver, ValueSource, ENUMERATION_OPTION_PREFIX,
};
pub use scope::{DirectiveTree, Scope, ScopeId};
