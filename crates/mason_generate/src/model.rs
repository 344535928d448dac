//! Aggregation of resolved directives into a generator-neutral model.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mason_project::{Directive, DirectiveVisitor, PluginDirective, Scope};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::GenerateError;

/// Target name used when no `target_name` directive is reached.
pub const DEFAULT_TARGET_NAME: &str = "Project";

const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "c++", "m", "mm"];
const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "h++", "inl"];

/// Compilation role of a file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A translation unit.
    Source,
    /// A header.
    Header,
}

impl SourceKind {
    /// Classifies `path` by extension (case-insensitive). Returns `None` for
    /// files that are neither sources nor headers.
    pub fn classify(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if SOURCE_EXTENSIONS.contains(&ext.as_str()) {
            Some(SourceKind::Source)
        } else if HEADER_EXTENSIONS.contains(&ext.as_str()) {
            Some(SourceKind::Header)
        } else {
            None
        }
    }
}

/// Everything a generator needs, in directive order.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectModel {
    /// Target name; the last reached `target_name` wins.
    pub target_name: String,
    /// Preprocessor definitions as `(name, value)`.
    pub defines: Vec<(String, Option<String>)>,
    /// Project include directories.
    pub include_directories: Vec<PathBuf>,
    /// Third-party include directories.
    pub system_include_directories: Vec<PathBuf>,
    /// Project translation units.
    pub source_files: Vec<PathBuf>,
    /// Project headers.
    pub header_files: Vec<PathBuf>,
    /// Third-party translation units.
    pub thirdparty_source_files: Vec<PathBuf>,
    /// Third-party headers.
    pub thirdparty_header_files: Vec<PathBuf>,
    /// Plugin directives reached during resolution, in traversal order.
    #[serde(skip)]
    pub plugin_directives: Vec<Arc<dyn PluginDirective>>,
}

impl ProjectModel {
    /// Definitions rendered as compiler arguments without the `-D` prefix.
    pub fn define_flags(&self) -> Vec<String> {
        self.defines
            .iter()
            .map(|(name, value)| match value {
                Some(value) => format!("{name}={value}"),
                None => name.clone(),
            })
            .collect()
    }

    /// Reached plugin directives of concrete type `T`.
    pub fn plugin_directives<T: 'static>(&self) -> impl Iterator<Item = &T> {
        self.plugin_directives
            .iter()
            .filter_map(|d| d.as_any().downcast_ref::<T>())
    }

    /// Adds a file produced during the pass (e.g. by a plugin) to the
    /// matching list. Files that are neither sources nor headers, or that are
    /// already listed, are ignored. Returns `true` if the file was added.
    pub fn add_generated_file(&mut self, path: PathBuf) -> bool {
        let list = match SourceKind::classify(&path) {
            Some(SourceKind::Source) => &mut self.source_files,
            Some(SourceKind::Header) => &mut self.header_files,
            None => return false,
        };
        if list.contains(&path) {
            return false;
        }
        list.push(path);
        true
    }

    /// All files of the model, project files first.
    pub fn all_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.source_files
            .iter()
            .chain(&self.header_files)
            .chain(&self.thirdparty_source_files)
            .chain(&self.thirdparty_header_files)
    }
}

#[derive(Debug)]
enum SourceInput {
    Directory(PathBuf),
    File(PathBuf),
}

/// A [`DirectiveVisitor`] that collects a [`ProjectModel`].
///
/// Source directories are only recorded during the visit and walked by
/// [`finish`](Self::finish), in sorted order, so the model is reproducible.
/// Excluded directories (the build directory) are pruned from every walk.
#[derive(Debug, Default)]
pub struct ModelCollector {
    excluded: Vec<PathBuf>,
    plugin_directives: Vec<Arc<dyn PluginDirective>>,
    target_name: Option<String>,
    defines: Vec<(String, Option<String>)>,
    include_directories: Vec<PathBuf>,
    system_include_directories: Vec<PathBuf>,
    inputs: Vec<(SourceInput, bool)>,
}

impl ModelCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Never enumerates files below `directory` when walking source
    /// directories.
    pub fn exclude_directory(mut self, directory: &Path) -> Self {
        self.excluded.push(directory.to_path_buf());
        self
    }

    /// Expands source directories and classifies every file.
    ///
    /// A file reached more than once is kept at its first position.
    pub fn finish(self) -> Result<ProjectModel, GenerateError> {
        let mut model = ProjectModel {
            target_name: self
                .target_name
                .unwrap_or_else(|| DEFAULT_TARGET_NAME.to_string()),
            defines: self.defines,
            include_directories: self.include_directories,
            system_include_directories: self.system_include_directories,
            source_files: Vec::new(),
            header_files: Vec::new(),
            thirdparty_source_files: Vec::new(),
            thirdparty_header_files: Vec::new(),
            plugin_directives: self.plugin_directives,
        };

        let mut seen = BTreeSet::new();
        for (input, thirdparty) in self.inputs {
            let files = match input {
                SourceInput::File(file) => vec![file],
                SourceInput::Directory(dir) => walk(&dir, &self.excluded)?,
            };
            for file in files {
                let Some(kind) = SourceKind::classify(&file) else {
                    continue;
                };
                if !seen.insert(file.clone()) {
                    continue;
                }
                let list = match (kind, thirdparty) {
                    (SourceKind::Source, false) => &mut model.source_files,
                    (SourceKind::Header, false) => &mut model.header_files,
                    (SourceKind::Source, true) => &mut model.thirdparty_source_files,
                    (SourceKind::Header, true) => &mut model.thirdparty_header_files,
                };
                list.push(file);
            }
        }
        Ok(model)
    }
}

impl DirectiveVisitor for ModelCollector {
    fn visit_directive(&mut self, _scope: &Scope, directive: &Directive) {
        match directive {
            Directive::TargetName(name) => self.target_name = Some(name.clone()),
            Directive::Define { name, value } => self.defines.push((name.clone(), value.clone())),
            Directive::HeaderPaths { paths, thirdparty } => {
                let list = if *thirdparty {
                    &mut self.system_include_directories
                } else {
                    &mut self.include_directories
                };
                for path in paths {
                    if !list.contains(path) {
                        list.push(path.clone());
                    }
                }
            }
            Directive::SourceDirectories {
                directories,
                thirdparty,
            } => self.inputs.extend(
                directories
                    .iter()
                    .map(|d| (SourceInput::Directory(d.clone()), *thirdparty)),
            ),
            Directive::SourceFiles { files, thirdparty } => self.inputs.extend(
                files
                    .iter()
                    .map(|f| (SourceInput::File(f.clone()), *thirdparty)),
            ),
            Directive::Plugin(plugin) => self.plugin_directives.push(Arc::clone(plugin)),
            // Choices only matter to the resolver.
            Directive::Enumeration(_) => {}
            // Consumed by the resolver before reaching visitors.
            Directive::Import(_)
            | Directive::Selector(_)
            | Directive::GeneratorSelector(_)
            | Directive::PlatformSelector(_)
            | Directive::RootProjectSelector { .. } => {}
        }
    }
}

/// Regular files under `dir`, recursively, sorted by name at each level.
/// Subtrees rooted at an `excluded` directory are skipped.
fn walk(dir: &Path, excluded: &[PathBuf]) -> Result<Vec<PathBuf>, GenerateError> {
    let mut files = Vec::new();
    let entries = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !excluded.iter().any(|x| entry.path() == x));
    for entry in entries {
        let entry = entry.map_err(|e| GenerateError::SourceEnumeration {
            path: dir.to_path_buf(),
            source: e,
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
