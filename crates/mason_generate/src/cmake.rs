//! CMake project generator.
//!
//! Output layout below the generator's output directory:
//!
//! - `CMakeLists.txt`: project declaration, reconfigure dependencies on the
//!   project files, `add_subdirectory(src)`.
//! - `src/CMakeLists.txt`: definitions, include directories, the target.
//! - `src/SourceFiles.cmake`: the four file lists.
//! - `src/SourceGroups.cmake`: IDE folders mirroring the project layout.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use mason_common::relative_path;
use mason_emit::{FileEmitter, Template};

use crate::error::GenerateError;
use crate::generator::{GenerateContext, Generator};
use crate::tool::ToolCommand;

const ROOT_TEMPLATE: &str = include_str!("templates/root-CMakeLists.txt.in");
const SRC_TEMPLATE: &str = include_str!("templates/src-CMakeLists.txt.in");

const BANNER: &str = "\n\
# ------------------------------------------------------\n\
# THIS IS AN AUTOMATICALLY GENERATED FILE. DO NOT EDIT!\n\
# ------------------------------------------------------\n\
\n";

fn root_template() -> &'static Template {
    static TEMPLATE: OnceLock<Template> = OnceLock::new();
    TEMPLATE.get_or_init(|| Template::parse(ROOT_TEMPLATE))
}

fn src_template() -> &'static Template {
    static TEMPLATE: OnceLock<Template> = OnceLock::new();
    TEMPLATE.get_or_init(|| Template::parse(SRC_TEMPLATE))
}

/// Generates a CMake build for the project.
#[derive(Debug, Clone, Copy, Default)]
pub struct CMakeGenerator;

impl Generator for CMakeGenerator {
    fn name(&self) -> &str {
        "cmake"
    }

    fn description(&self) -> &str {
        "CMakeLists.txt with source lists and IDE source groups"
    }

    fn generate(&self, context: &mut GenerateContext<'_>) -> Result<(), GenerateError> {
        let project = context.project();
        let model = context.model();
        let out = context.output_directory().to_path_buf();
        let src = out.join("src");

        // Root CMakeLists.txt

        let mut project_groups = Groups::default();
        let mut project_files = String::new();
        for file in project.files() {
            let path = relative_path(&out, file);
            let _ = writeln!(project_files, "    \"{}\"", cmake_escape_path(&path));
            project_groups.add(&group_name(project.directory(), file), path);
        }

        let mut variables = BTreeMap::new();
        variables.insert("target_name".to_string(), cmake_escape(&model.target_name));
        variables.insert(
            "project_directory".to_string(),
            cmake_escape_path(&project.directory().to_string_lossy()),
        );
        variables.insert("project_files".to_string(), project_files);
        variables.insert("project_file_groups".to_string(), project_groups.render());

        let mut emitter = FileEmitter::new(&out.join("CMakeLists.txt"));
        emitter.append(BANNER);
        root_template().emit(&mut emitter, &variables)?;
        context.commit(&emitter)?;

        // src/CMakeLists.txt

        let mut defines = String::new();
        if !model.defines.is_empty() {
            defines.push_str("add_definitions(\n");
            for flag in model.define_flags() {
                let _ = writeln!(defines, "    \"-D{}\"", cmake_escape(&flag));
            }
            defines.push_str(")\n\n");
        }

        let mut includes = String::new();
        for (header, dirs) in [
            ("include_directories(", &model.include_directories),
            ("include_directories(SYSTEM", &model.system_include_directories),
        ] {
            if dirs.is_empty() {
                continue;
            }
            let _ = writeln!(includes, "{header}");
            for dir in dirs {
                let path = relative_path(&src, dir);
                let _ = writeln!(includes, "    \"{}\"", cmake_escape_path(&path));
            }
            includes.push_str(")\n\n");
        }

        let mut variables = BTreeMap::new();
        variables.insert("target_name".to_string(), cmake_escape(&model.target_name));
        variables.insert("defines".to_string(), defines);
        variables.insert("include_directories".to_string(), includes);

        let mut emitter = FileEmitter::new(&src.join("CMakeLists.txt"));
        emitter.append(BANNER);
        src_template().emit(&mut emitter, &variables)?;
        context.commit(&emitter)?;

        // src/SourceFiles.cmake and src/SourceGroups.cmake

        let mut groups = Groups::default();
        let mut lists = FileEmitter::new(&src.join("SourceFiles.cmake"));
        lists.append(BANNER);
        for (variable, files) in [
            ("source_files", &model.source_files),
            ("header_files", &model.header_files),
            ("third_party_source_files", &model.thirdparty_source_files),
            ("third_party_header_files", &model.thirdparty_header_files),
        ] {
            let paths: Vec<String> = files.iter().map(|f| relative_path(&src, f)).collect();
            write_source_list(&mut lists, variable, &paths);
            for (file, path) in files.iter().zip(paths) {
                groups.add(&group_name(project.directory(), file), path);
            }
        }
        context.commit(&lists)?;

        let mut group_file = FileEmitter::new(&src.join("SourceGroups.cmake"));
        group_file.append(BANNER);
        group_file.append(&groups.render());
        context.commit(&group_file)?;

        Ok(())
    }

    fn build_command(&self, output_directory: &Path) -> Option<ToolCommand> {
        Some(ToolCommand {
            program: "cmake".to_string(),
            args: vec![
                "-S".to_string(),
                output_directory.to_string_lossy().into_owned(),
                "-B".to_string(),
                output_directory.join("build").to_string_lossy().into_owned(),
            ],
            working_dir: Some(output_directory.to_path_buf()),
        })
    }
}

/// Files bucketed by source group, groups in first-seen order.
#[derive(Debug, Default)]
struct Groups {
    groups: Vec<(String, Vec<String>)>,
}

impl Groups {
    fn add(&mut self, group: &str, path: String) {
        match self.groups.iter_mut().find(|(name, _)| name == group) {
            Some((_, files)) => files.push(path),
            None => self.groups.push((group.to_string(), vec![path])),
        }
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (name, files) in &self.groups {
            let _ = writeln!(out, "source_group(\"{}\" FILES", cmake_escape(name));
            for file in files {
                let _ = writeln!(out, "    \"{}\"", cmake_escape_path(file));
            }
            out.push_str(")\n\n");
        }
        out
    }
}

fn write_source_list(emitter: &mut FileEmitter, variable: &str, paths: &[String]) {
    if paths.is_empty() {
        let _ = writeln!(emitter, "set({variable})");
        return;
    }
    let _ = writeln!(emitter, "set({variable}");
    for path in paths {
        let _ = writeln!(emitter, "    \"{}\"", cmake_escape_path(path));
    }
    emitter.append(")\n");
}

/// The IDE folder for `file`: its directory relative to the project root,
/// with `\` separators and leading `..\` segments removed.
fn group_name(project_directory: &Path, file: &Path) -> String {
    let parent = file.parent().map(Path::to_path_buf).unwrap_or_else(PathBuf::new);
    let mut name = relative_path(project_directory, &parent).replace('/', "\\");
    while let Some(rest) = name.strip_prefix("..\\") {
        name = rest.to_string();
    }
    if name == ".." {
        name.clear();
    }
    name
}

/// Escapes `\` and `"` for a quoted CMake argument.
pub fn cmake_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(ch),
        }
    }
    out
}

/// Like [`cmake_escape`], but on Windows turns `\` separators into `/`.
pub fn cmake_escape_path(s: &str) -> String {
    if cfg!(windows) {
        cmake_escape(&s.replace('\\', "/"))
    } else {
        cmake_escape(s)
    }
}
