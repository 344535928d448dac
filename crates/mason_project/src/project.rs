//! A loaded project.

use std::path::{Path, PathBuf};

use crate::directive::Directive;
use crate::enumeration::Enumeration;
use crate::loader::PROJECT_FILE_NAME;
use crate::scope::DirectiveTree;

/// Name of the build-output directory inside the project directory.
pub const BUILD_DIRECTORY_NAME: &str = ".build";

/// Root directory plus the directive tree loaded from it.
///
/// Immutable once the loader returns it.
#[derive(Debug)]
pub struct Project {
    directory: PathBuf,
    tree: DirectiveTree,
    files: Vec<PathBuf>,
}

impl Project {
    pub(crate) fn new(directory: PathBuf, tree: DirectiveTree, files: Vec<PathBuf>) -> Self {
        Self {
            directory,
            tree,
            files,
        }
    }

    /// Canonical project directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The root project file.
    pub fn project_file(&self) -> PathBuf {
        self.directory.join(PROJECT_FILE_NAME)
    }

    /// Where the build cache and generated files live.
    pub fn build_directory(&self) -> PathBuf {
        self.directory.join(BUILD_DIRECTORY_NAME)
    }

    /// The directive tree.
    pub fn tree(&self) -> &DirectiveTree {
        &self.tree
    }

    /// Every project file read while loading, in first-read order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Every enumeration declared anywhere in the tree, in scope order.
    ///
    /// Includes declarations inside selector branches that a given pass may
    /// never enter.
    pub fn enumerations(&self) -> Vec<&Enumeration> {
        (0..self.tree.len())
            .flat_map(|index| {
                self.tree
                    .scope(crate::scope::ScopeId(index as u32))
                    .directives
                    .iter()
            })
            .filter_map(|d| match d {
                Directive::Enumeration(e) => Some(e),
                _ => None,
            })
            .collect()
    }
}
