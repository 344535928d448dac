//! Diffed file output for generated build files.
//!
//! A [`FileEmitter`] accumulates text in memory and, on commit, asks the
//! [`BuildCache`](mason_cache::BuildCache) whether the content hash changed.
//! Unchanged files are left untouched so their modification times stay put.
//! [`Template`] provides `@{name}` substitution for the text itself.

#![warn(missing_docs)]

pub mod emitter;
pub mod error;
pub mod template;

pub use emitter::FileEmitter;
pub use error::{EmitError, TemplateError};
pub use template::Template;
