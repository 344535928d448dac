//! Loading `project.toml` files into a [`DirectiveTree`].
//!
//! Keys are processed in file order (the `toml` crate is built with
//! `preserve_order`), which makes directive order, and therefore the
//! visibility of enumerations to later selectors, follow the file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mason_common::canonical_path;

use crate::directive::{BranchSelector, Directive, PluginDirective, Selector};
use crate::enumeration::{is_identifier, Enumeration};
use crate::error::ConfigError;
use crate::project::Project;
use crate::scope::{DirectiveTree, ScopeId};

/// File name of a project description.
pub const PROJECT_FILE_NAME: &str = "project.toml";

/// Parses directive keys the built-in set does not know.
///
/// Parsers are consulted in registration order; the first one returning
/// `Some` claims the key.
pub trait DirectiveParser: Send + Sync {
    /// Parses `key = value` declared in `file`, or returns `Ok(None)` to
    /// decline the key.
    fn parse(
        &self,
        file: &Path,
        key: &str,
        value: &toml::Value,
    ) -> Result<Option<Box<dyn PluginDirective>>, ConfigError>;
}

/// Reads a project directory into a [`Project`].
#[derive(Default)]
pub struct ProjectLoader {
    parsers: Vec<Box<dyn DirectiveParser>>,
}

impl ProjectLoader {
    /// Creates a loader that only understands the built-in directives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin directive parser.
    pub fn with_parser(mut self, parser: Box<dyn DirectiveParser>) -> Self {
        self.parsers.push(parser);
        self
    }

    /// Loads `<directory>/project.toml` and everything it imports.
    pub fn load(&self, directory: &Path) -> Result<Project, ConfigError> {
        let directory = canonical_path(directory);
        let mut state = LoadState::new(self, &directory);
        let root = state.tree.root();
        state.load_file(root, &directory.join(PROJECT_FILE_NAME))?;
        Ok(state.finish(directory))
    }

    /// Loads a root project description given as a string.
    ///
    /// Relative paths resolve against `directory`; imports are still read
    /// from disk.
    pub fn load_from_str(&self, directory: &Path, content: &str) -> Result<Project, ConfigError> {
        let directory = canonical_path(directory);
        let file = directory.join(PROJECT_FILE_NAME);
        let mut state = LoadState::new(self, &directory);
        let root = state.tree.root();
        state.stack.push(file.clone());
        let table = parse_table(&file, content)?;
        state.load_table(root, &file, &table)?;
        state.stack.pop();
        Ok(state.finish(directory))
    }
}

impl std::fmt::Debug for ProjectLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectLoader")
            .field("parsers", &self.parsers.len())
            .finish()
    }
}

struct LoadState<'a> {
    loader: &'a ProjectLoader,
    tree: DirectiveTree,
    stack: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

impl<'a> LoadState<'a> {
    fn new(loader: &'a ProjectLoader, directory: &Path) -> Self {
        Self {
            loader,
            tree: DirectiveTree::new(directory),
            stack: Vec::new(),
            files: Vec::new(),
        }
    }

    fn finish(self, directory: PathBuf) -> Project {
        Project::new(directory, self.tree, self.files)
    }

    fn load_file(&mut self, scope: ScopeId, file: &Path) -> Result<(), ConfigError> {
        // Re-entering a file that is still being read would recurse forever;
        // the import contributes nothing instead.
        if self.stack.iter().any(|f| f == file) {
            return Ok(());
        }

        let content = std::fs::read_to_string(file).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::MissingProjectFile {
                    path: file.to_path_buf(),
                }
            } else {
                ConfigError::Io {
                    path: file.to_path_buf(),
                    source: e,
                }
            }
        })?;
        let table = parse_table(file, &content)?;

        if !self.files.iter().any(|f| f == file) {
            self.files.push(file.to_path_buf());
        }
        self.stack.push(file.to_path_buf());
        let result = self.load_table(scope, file, &table);
        self.stack.pop();
        result
    }

    fn load_table(
        &mut self,
        scope: ScopeId,
        file: &Path,
        table: &toml::Table,
    ) -> Result<(), ConfigError> {
        let directory = self.tree.scope(scope).directory.clone();

        for (key, value) in table {
            match key.as_str() {
                "import" => {
                    for entry in string_list(file, key, value)? {
                        let imported = canonical_path(&directory.join(entry));
                        let child = self.tree.add_scope(scope, &imported, true);
                        self.tree.add_directive(scope, Directive::Import(child));
                        self.load_file(child, &imported.join(PROJECT_FILE_NAME))?;
                    }
                }
                "target_name" => {
                    let name = string(file, key, value)?;
                    if !is_identifier(name) {
                        return Err(ConfigError::InvalidTargetName {
                            file: file.to_path_buf(),
                            name: name.to_string(),
                        });
                    }
                    self.tree
                        .add_directive(scope, Directive::TargetName(name.to_string()));
                }
                "define" => {
                    for entry in string_list(file, key, value)? {
                        let (name, definition) = match entry.split_once('=') {
                            Some((name, v)) => (name.trim(), Some(v.trim().to_string())),
                            None => (entry.trim(), None),
                        };
                        if name.is_empty() {
                            return Err(invalid(file, key, "empty macro name"));
                        }
                        self.tree.add_directive(
                            scope,
                            Directive::Define {
                                name: name.to_string(),
                                value: definition,
                            },
                        );
                    }
                }
                "header_search_paths" | "3rdparty_header_search_paths" => {
                    let paths = resolve_paths(&directory, string_list(file, key, value)?);
                    self.tree.add_directive(
                        scope,
                        Directive::HeaderPaths {
                            paths,
                            thirdparty: key.starts_with("3rdparty"),
                        },
                    );
                }
                "source_directories" | "3rdparty_source_directories" => {
                    let directories = resolve_paths(&directory, string_list(file, key, value)?);
                    if let Some(missing) = directories.iter().find(|d| !d.is_dir()) {
                        return Err(ConfigError::MissingDirectory {
                            file: file.to_path_buf(),
                            path: missing.clone(),
                        });
                    }
                    self.tree.add_directive(
                        scope,
                        Directive::SourceDirectories {
                            directories,
                            thirdparty: key.starts_with("3rdparty"),
                        },
                    );
                }
                "source_files" | "3rdparty_source_files" => {
                    let files = resolve_paths(&directory, string_list(file, key, value)?);
                    self.tree.add_directive(
                        scope,
                        Directive::SourceFiles {
                            files,
                            thirdparty: key.starts_with("3rdparty"),
                        },
                    );
                }
                "enum" => {
                    for (id, body) in table_of(file, key, value)? {
                        let enumeration = parse_enumeration(file, id, body)?;
                        if !self.tree.reserve_enumeration_id(scope, id) {
                            return Err(ConfigError::DuplicateEnumeration {
                                file: file.to_path_buf(),
                                id: id.clone(),
                            });
                        }
                        self.tree
                            .add_directive(scope, Directive::Enumeration(enumeration));
                    }
                }
                "+generator" => {
                    let branches = self.load_branches(scope, file, key, value)?;
                    self.tree
                        .add_directive(scope, Directive::GeneratorSelector(branches));
                }
                "+platform" => {
                    let branches = self.load_branches(scope, file, key, value)?;
                    self.tree
                        .add_directive(scope, Directive::PlatformSelector(branches));
                }
                "+if(root_project)" => {
                    let body = table_of(file, key, value)?;
                    let inner = self.tree.add_scope(scope, &directory, false);
                    self.load_table(inner, file, body)?;
                    self.tree.add_directive(
                        scope,
                        Directive::RootProjectSelector {
                            scope: inner,
                            active: self.stack.len() == 1,
                        },
                    );
                }
                _ if key.starts_with('^') => {
                    let (id, values) = parse_selector_key(file, key)?;
                    let enumeration = self.tree.visible_enumeration(scope, &id).ok_or_else(|| {
                        ConfigError::UndeclaredEnumeration {
                            file: file.to_path_buf(),
                            id: id.clone(),
                        }
                    })?;
                    if let Some(bad) = values.iter().find(|v| !enumeration.contains(v)) {
                        return Err(ConfigError::IllegalSelectorValue {
                            file: file.to_path_buf(),
                            id,
                            value: bad.clone(),
                        });
                    }

                    let body = table_of(file, key, value)?;
                    let inner = self.tree.add_scope(scope, &directory, false);
                    self.load_table(inner, file, body)?;
                    self.tree.add_directive(
                        scope,
                        Directive::Selector(Selector {
                            enumeration: id,
                            values,
                            scope: inner,
                        }),
                    );
                }
                _ => {
                    let directive = self.parse_plugin(file, key, value)?;
                    self.tree
                        .add_directive(scope, Directive::Plugin(Arc::from(directive)));
                }
            }
        }
        Ok(())
    }

    /// Loads `{ "+name" = {...}, "+default" = {...} }` into opaque branch scopes.
    fn load_branches(
        &mut self,
        scope: ScopeId,
        file: &Path,
        key: &str,
        value: &toml::Value,
    ) -> Result<BranchSelector, ConfigError> {
        let directory = self.tree.scope(scope).directory.clone();
        let mut selector = BranchSelector::default();

        for (branch, body) in table_of(file, key, value)? {
            let name = branch
                .strip_prefix('+')
                .filter(|name| is_identifier(name))
                .ok_or_else(|| {
                    invalid(
                        file,
                        key,
                        &format!("branch \"{branch}\" must be \"+<name>\" or \"+default\""),
                    )
                })?;
            let body = table_of(file, branch, body)?;
            let inner = self.tree.add_scope(scope, &directory, false);
            self.load_table(inner, file, body)?;

            if name == "default" {
                selector.default = Some(inner);
            } else {
                selector.branches.push((name.to_string(), inner));
            }
        }
        Ok(selector)
    }

    fn parse_plugin(
        &self,
        file: &Path,
        key: &str,
        value: &toml::Value,
    ) -> Result<Box<dyn PluginDirective>, ConfigError> {
        for parser in &self.loader.parsers {
            if let Some(directive) = parser.parse(file, key, value)? {
                return Ok(directive);
            }
        }
        Err(ConfigError::UnknownDirective {
            file: file.to_path_buf(),
            key: key.to_string(),
        })
    }
}

fn parse_table(file: &Path, content: &str) -> Result<toml::Table, ConfigError> {
    content
        .parse::<toml::Table>()
        .map_err(|e| ConfigError::Parse {
            path: file.to_path_buf(),
            reason: e.to_string(),
        })
}

fn parse_enumeration(file: &Path, id: &str, body: &toml::Value) -> Result<Enumeration, ConfigError> {
    let key = format!("enum.{id}");
    if !is_identifier(id) {
        return Err(invalid(file, &key, "enumeration id must match [A-Za-z0-9_-]+"));
    }

    let mut enumeration = Enumeration {
        id: id.to_string(),
        title: id.to_string(),
        default: None,
        values: Vec::new(),
    };

    for (field, value) in table_of(file, &key, body)? {
        match field.as_str() {
            "title" => enumeration.title = string(file, &key, value)?.to_string(),
            "default" => enumeration.default = Some(string(file, &key, value)?.to_string()),
            "values" => {
                for (v, label) in table_of(file, &key, value)? {
                    if !is_identifier(v) {
                        return Err(invalid(
                            file,
                            &key,
                            &format!("value \"{v}\" must match [A-Za-z0-9_-]+"),
                        ));
                    }
                    enumeration
                        .values
                        .push((v.clone(), string(file, &key, label)?.to_string()));
                }
            }
            other => return Err(invalid(file, &key, &format!("unknown field \"{other}\""))),
        }
    }

    if enumeration.values.is_empty() {
        return Err(invalid(file, &key, "at least one value is required"));
    }
    if let Some(default) = &enumeration.default {
        if !enumeration.contains(default) {
            return Err(invalid(
                file,
                &key,
                &format!("default \"{default}\" is not a declared value"),
            ));
        }
    }
    Ok(enumeration)
}

/// Splits `^id(v1, v2)` into the id and its match set.
fn parse_selector_key(file: &Path, key: &str) -> Result<(String, BTreeSet<String>), ConfigError> {
    let malformed = || ConfigError::InvalidSelector {
        file: file.to_path_buf(),
        key: key.to_string(),
    };

    let rest = key.strip_prefix('^').ok_or_else(malformed)?;
    let (id, list) = rest.split_once('(').ok_or_else(malformed)?;
    let list = list.strip_suffix(')').ok_or_else(malformed)?;
    let id = id.trim();
    if !is_identifier(id) {
        return Err(malformed());
    }

    let values: BTreeSet<String> = list.split(',').map(|v| v.trim().to_string()).collect();
    if values.iter().any(|v| !is_identifier(v)) {
        return Err(malformed());
    }
    Ok((id.to_string(), values))
}

fn resolve_paths(directory: &Path, entries: Vec<&str>) -> Vec<PathBuf> {
    entries
        .into_iter()
        .map(|entry| canonical_path(&directory.join(entry)))
        .collect()
}

fn invalid(file: &Path, key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        file: file.to_path_buf(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn string<'v>(file: &Path, key: &str, value: &'v toml::Value) -> Result<&'v str, ConfigError> {
    value
        .as_str()
        .ok_or_else(|| invalid(file, key, "expected a string"))
}

/// Accepts either a single string or an array of strings.
fn string_list<'v>(
    file: &Path,
    key: &str,
    value: &'v toml::Value,
) -> Result<Vec<&'v str>, ConfigError> {
    match value {
        toml::Value::String(s) => Ok(vec![s.as_str()]),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| invalid(file, key, "expected an array of strings"))
            })
            .collect(),
        _ => Err(invalid(file, key, "expected a string or an array of strings")),
    }
}

fn table_of<'v>(
    file: &Path,
    key: &str,
    value: &'v toml::Value,
) -> Result<&'v toml::Table, ConfigError> {
    value
        .as_table()
        .ok_or_else(|| invalid(file, key, "expected a table"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn root_directives(project: &Project) -> &[Directive] {
        &project.tree().scope(project.tree().root()).directives
    }

    #[test]
    fn load_basic_directives_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        write(
            dir.path(),
            "project.toml",
            r#"
target_name = "Demo"
define = ["DEBUG", "LEVEL=3"]
header_search_paths = ["include"]
3rdparty_header_search_paths = "vendor/include"
source_directories = ["src"]
source_files = ["main.cpp"]
"#,
        );

        let project = ProjectLoader::new().load(dir.path()).unwrap();
        let d = root_directives(&project);
        assert_eq!(d.len(), 7);
        assert!(matches!(&d[0], Directive::TargetName(n) if n == "Demo"));
        assert!(matches!(&d[1], Directive::Define { name, value: None } if name == "DEBUG"));
        assert!(
            matches!(&d[2], Directive::Define { name, value: Some(v) } if name == "LEVEL" && v == "3")
        );
        match &d[4] {
            Directive::HeaderPaths { paths, thirdparty } => {
                assert!(*thirdparty);
                assert!(paths[0].ends_with("vendor/include"));
                assert!(paths[0].is_absolute());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(&d[5], Directive::SourceDirectories { thirdparty: false, .. }));
        assert_eq!(project.files().len(), 1);
    }

    #[test]
    fn missing_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectLoader::new().load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingProjectFile { .. }));
    }

    #[test]
    fn invalid_toml_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectLoader::new()
            .load_from_str(dir.path(), "this is not valid toml {{{}}}")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unknown_directive_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectLoader::new()
            .load_from_str(dir.path(), "sources = [\"a.c\"]")
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDirective { key, .. } if key == "sources"));
    }

    #[test]
    fn invalid_target_name_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectLoader::new()
            .load_from_str(dir.path(), "target_name = \"my app\"")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTargetName { .. }));
    }

    #[test]
    fn missing_source_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectLoader::new()
            .load_from_str(dir.path(), "source_directories = [\"nope\"]")
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingDirectory { .. }));
    }

    #[test]
    fn enumeration_declaration() {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectLoader::new()
            .load_from_str(
                dir.path(),
                r#"
[enum.mode]
title = "Build mode"
default = "release"
values = { debug = "Debug", release = "Release", profile = "Profile" }
"#,
            )
            .unwrap();
        let e = project.enumerations();
        assert_eq!(e.len(), 1);
        assert_eq!(e[0].title, "Build mode");
        assert_eq!(e[0].default.as_deref(), Some("release"));
        let values: Vec<_> = e[0].values.iter().map(|(v, _)| v.as_str()).collect();
        assert_eq!(values, ["debug", "release", "profile"]);
    }

    #[test]
    fn enumeration_default_must_be_declared() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectLoader::new()
            .load_from_str(
                dir.path(),
                "[enum.mode]\ndefault = \"fast\"\nvalues = { debug = \"Debug\" }\n",
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn duplicate_enumeration_across_import_errors() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "lib/project.toml",
            "[enum.mode]\nvalues = { debug = \"Debug\" }\n",
        );
        let err = ProjectLoader::new()
            .load_from_str(
                dir.path(),
                "import = [\"lib\"]\n[enum.mode]\nvalues = { debug = \"Debug\" }\n",
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEnumeration { id, .. } if id == "mode"));
    }

    #[test]
    fn same_enumeration_in_sibling_branches_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectLoader::new()
            .load_from_str(
                dir.path(),
                r#"
["+generator"."+cmake".enum.mode]
values = { debug = "Debug" }

["+generator"."+default".enum.mode]
values = { debug = "Debug" }
"#,
            )
            .unwrap();
        assert_eq!(project.enumerations().len(), 2);
    }

    #[test]
    fn selector_requires_declared_enumeration() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectLoader::new()
            .load_from_str(dir.path(), "[\"^mode(debug)\"]\ndefine = [\"X\"]\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::UndeclaredEnumeration { .. }));
    }

    #[test]
    fn selector_values_must_be_legal() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectLoader::new()
            .load_from_str(
                dir.path(),
                r#"
[enum.mode]
values = { debug = "Debug", release = "Release" }

["^mode(release, profile)"]
define = ["NDEBUG"]
"#,
            )
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::IllegalSelectorValue { value, .. } if value == "profile")
        );
    }

    #[test]
    fn selector_is_parsed_into_opaque_scope() {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectLoader::new()
            .load_from_str(
                dir.path(),
                r#"
[enum.mode]
values = { debug = "Debug", release = "Release" }

["^mode(release)"]
define = ["NDEBUG"]
"#,
            )
            .unwrap();
        match &root_directives(&project)[1] {
            Directive::Selector(selector) => {
                assert_eq!(selector.enumeration, "mode");
                assert!(selector.matches("release"));
                let inner = project.tree().scope(selector.scope);
                assert!(!inner.transparent);
                assert_eq!(inner.directives.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_selector_key_errors() {
        let dir = tempfile::tempdir().unwrap();
        for key in ["^mode", "^mode(debug", "^(debug)", "^mode()"] {
            let content = format!(
                "[enum.mode]\nvalues = {{ debug = \"Debug\" }}\n[\"{key}\"]\ndefine = [\"X\"]\n"
            );
            let err = ProjectLoader::new()
                .load_from_str(dir.path(), &content)
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidSelector { .. }), "{key}");
        }
    }

    #[test]
    fn generator_branches_and_default() {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectLoader::new()
            .load_from_str(
                dir.path(),
                r#"
["+generator"."+cmake"]
define = ["CMAKE"]

["+generator"."+default"]
define = ["OTHER"]
"#,
            )
            .unwrap();
        match &root_directives(&project)[0] {
            Directive::GeneratorSelector(s) => {
                assert_eq!(s.branches.len(), 1);
                assert_eq!(s.branches[0].0, "cmake");
                assert!(s.default.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_branch_key_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectLoader::new()
            .load_from_str(dir.path(), "[\"+platform\".linux]\ndefine = [\"X\"]\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn imports_create_transparent_scopes() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lib/project.toml", "define = [\"LIB\"]\n");
        write(dir.path(), "project.toml", "import = [\"lib\"]\n");

        let project = ProjectLoader::new().load(dir.path()).unwrap();
        match &root_directives(&project)[0] {
            Directive::Import(scope) => {
                let scope = project.tree().scope(*scope);
                assert!(scope.transparent);
                assert!(scope.directory.ends_with("lib"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(project.files().len(), 2);
    }

    #[test]
    fn import_paths_are_relative_to_the_importing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("lib/src")).unwrap();
        write(dir.path(), "lib/project.toml", "source_directories = [\"src\"]\n");
        write(dir.path(), "project.toml", "import = \"lib\"\n");

        let project = ProjectLoader::new().load(dir.path()).unwrap();
        let Directive::Import(scope) = &root_directives(&project)[0] else {
            panic!("expected import");
        };
        match &project.tree().scope(*scope).directives[0] {
            Directive::SourceDirectories { directories, .. } => {
                assert!(directories[0].ends_with("lib/src"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn import_cycle_is_cut_at_the_reentered_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/project.toml", "import = [\"../b\"]\ndefine = [\"A\"]\n");
        write(dir.path(), "b/project.toml", "import = [\"../a\"]\ndefine = [\"B\"]\n");
        write(dir.path(), "project.toml", "import = [\"a\"]\n");

        let project = ProjectLoader::new().load(dir.path()).unwrap();
        assert_eq!(project.files().len(), 3);

        // root -> a -> b -> (a again, empty)
        let Directive::Import(a) = &root_directives(&project)[0] else {
            panic!("expected import of a");
        };
        let Directive::Import(b) = &project.tree().scope(*a).directives[0] else {
            panic!("expected import of b");
        };
        let Directive::Import(again) = &project.tree().scope(*b).directives[0] else {
            panic!("expected import of a from b");
        };
        assert!(project.tree().scope(*again).directives.is_empty());
    }

    #[test]
    fn root_project_selector_is_active_only_in_root_file() {
        let dir = tempfile::tempdir().unwrap();
        let body = "[\"+if(root_project)\"]\ndefine = [\"STANDALONE\"]\n";
        write(dir.path(), "lib/project.toml", body);
        write(
            dir.path(),
            "project.toml",
            &format!("import = [\"lib\"]\n{body}"),
        );

        let project = ProjectLoader::new().load(dir.path()).unwrap();
        let directives = root_directives(&project);
        let Directive::Import(lib) = &directives[0] else {
            panic!("expected import");
        };
        match &directives[1] {
            Directive::RootProjectSelector { scope, active } => {
                assert!(*active);
                assert_eq!(project.tree().scope(*scope).directives.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &project.tree().scope(*lib).directives[0] {
            Directive::RootProjectSelector { active, .. } => assert!(!*active),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_import_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectLoader::new()
            .load_from_str(dir.path(), "import = [\"nowhere\"]")
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingProjectFile { .. }));
    }

    #[derive(Debug)]
    struct Banner(String);

    impl PluginDirective for Banner {
        fn key(&self) -> &str {
            "banner"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct BannerParser;

    impl DirectiveParser for BannerParser {
        fn parse(
            &self,
            file: &Path,
            key: &str,
            value: &toml::Value,
        ) -> Result<Option<Box<dyn PluginDirective>>, ConfigError> {
            if key != "banner" {
                return Ok(None);
            }
            let text = string(file, key, value)?;
            Ok(Some(Box::new(Banner(text.to_string()))))
        }
    }

    #[test]
    fn plugin_parser_claims_key() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ProjectLoader::new().with_parser(Box::new(BannerParser));
        let project = loader
            .load_from_str(dir.path(), "banner = \"hello\"")
            .unwrap();
        match &root_directives(&project)[0] {
            Directive::Plugin(p) => {
                assert_eq!(p.key(), "banner");
                let banner = p.as_any().downcast_ref::<Banner>().unwrap();
                assert_eq!(banner.0, "hello");
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = loader.load_from_str(dir.path(), "other = 1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDirective { .. }));
    }
}
