//! The `file2c` plugin: embeds binary files into C/C++ sources.
//!
//! ```toml
//! [file2c]
//! input = "assets/logo.png"
//! output = "logo.cpp"
//! identifier = "logo_png"
//! namespace = "assets::images"
//! compress = "zlib"
//! ```
//!
//! `file2c` also accepts an array of such tables. Each output lands in
//! `file2c/` below the generator's output directory and joins the project's
//! sources for the rest of the pass.

use std::any::Any;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Component, Path, PathBuf};

use flate2::write::ZlibEncoder;
use mason_common::canonical_path;
use mason_emit::FileEmitter;
use mason_project::{ConfigError, DirectiveParser, PluginDirective};

use crate::error::GenerateError;
use crate::generator::GenerateContext;
use crate::plugin::Plugin;

/// Directive key handled by this plugin.
pub const FILE2C_KEY: &str = "file2c";

/// Subdirectory of the generator output holding embedded files.
pub const FILE2C_DIRECTORY: &str = "file2c";

const BYTES_PER_LINE: usize = 12;

/// How embedded data is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    /// Raw bytes.
    #[default]
    None,
    /// A zlib stream.
    Zlib,
}

impl Compression {
    /// Every method, in the order listed by error messages.
    pub const ALL: [Compression; 2] = [Compression::None, Compression::Zlib];

    /// The name used in project files.
    pub fn name(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Zlib => "zlib",
        }
    }

    /// Looks a method up by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Encodes `data` with this method.
    pub fn apply(self, data: Vec<u8>) -> std::io::Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data),
            Compression::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&data)?;
                encoder.finish()
            }
        }
    }
}

/// One file to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFile {
    /// Canonical path of the file to embed.
    pub input: PathBuf,
    /// Output file name, relative to the `file2c` directory.
    pub output: PathBuf,
    /// Name of the generated array.
    pub identifier: String,
    /// Enclosing C++ namespace, `::`-separated.
    pub namespace: Option<String>,
    /// Storage of the data.
    pub compression: Option<Compression>,
}

impl EmbeddedFile {
    fn compression(&self) -> Compression {
        self.compression.unwrap_or_default()
    }

    /// Extra metadata for the input staleness check: changing any setting
    /// regenerates the output even if the input is untouched.
    fn metadata(&self) -> String {
        format!(
            "file2c\noutput={}\nidentifier={}\nnamespace={}\ncompress={}\n",
            self.output.display(),
            self.identifier,
            self.namespace.as_deref().unwrap_or(""),
            self.compression().name()
        )
    }
}

/// A parsed `file2c` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File2CDirective {
    /// Files declared by this directive, in declaration order.
    pub files: Vec<EmbeddedFile>,
}

impl PluginDirective for File2CDirective {
    fn key(&self) -> &str {
        FILE2C_KEY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Parses `file2c` keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct File2CParser;

impl DirectiveParser for File2CParser {
    fn parse(
        &self,
        file: &Path,
        key: &str,
        value: &toml::Value,
    ) -> Result<Option<Box<dyn PluginDirective>>, ConfigError> {
        if key != FILE2C_KEY {
            return Ok(None);
        }
        let base = file.parent().unwrap_or(Path::new("."));
        let files = match value {
            toml::Value::Table(table) => vec![parse_entry(file, base, table)?],
            toml::Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    toml::Value::Table(table) => parse_entry(file, base, table),
                    _ => Err(invalid(file, "expected an array of tables")),
                })
                .collect::<Result<_, _>>()?,
            _ => return Err(invalid(file, "expected a table or an array of tables")),
        };
        Ok(Some(Box::new(File2CDirective { files })))
    }
}

fn parse_entry(file: &Path, base: &Path, table: &toml::Table) -> Result<EmbeddedFile, ConfigError> {
    let mut input = None;
    let mut output = None;
    let mut identifier = None;
    let mut namespace = None;
    let mut compression = None;

    for (name, value) in table {
        let text = value
            .as_str()
            .ok_or_else(|| invalid(file, &format!("\"{name}\" expects a string")))?;
        match name.as_str() {
            "input" => {
                let path = base.join(text);
                if !path.exists() {
                    return Err(invalid(
                        file,
                        &format!("file \"{}\" does not exist", path.display()),
                    ));
                }
                input = Some(canonical_path(&path));
            }
            "output" => {
                let path = PathBuf::from(text);
                let plain = path
                    .components()
                    .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
                if text.is_empty() || !plain {
                    return Err(invalid(file, "\"output\" expects a relative file name"));
                }
                output = Some(path);
            }
            "identifier" => {
                if !is_c_identifier(text) {
                    return Err(invalid(
                        file,
                        &format!("\"{text}\" is not a valid C identifier"),
                    ));
                }
                identifier = Some(text.to_string());
            }
            "namespace" => {
                if !text.split("::").all(is_c_identifier) {
                    return Err(invalid(
                        file,
                        &format!("\"{text}\" is not a valid namespace"),
                    ));
                }
                namespace = Some(text.to_string());
            }
            "compress" => {
                let method = Compression::from_name(text).ok_or_else(|| {
                    let valid: Vec<_> = Compression::ALL.iter().map(|c| c.name()).collect();
                    invalid(
                        file,
                        &format!(
                            "invalid compression method \"{text}\", valid values are: \"{}\"",
                            valid.join("\", \"")
                        ),
                    )
                })?;
                compression = Some(method);
            }
            other => return Err(invalid(file, &format!("unknown option \"{other}\""))),
        }
    }

    Ok(EmbeddedFile {
        input: input.ok_or_else(|| invalid(file, "missing input file name"))?,
        output: output.ok_or_else(|| invalid(file, "missing output file name"))?,
        identifier: identifier.ok_or_else(|| invalid(file, "missing identifier"))?,
        namespace,
        compression,
    })
}

fn invalid(file: &Path, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        file: file.to_path_buf(),
        key: FILE2C_KEY.to_string(),
        reason: reason.to_string(),
    }
}

fn is_c_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Writes every `file2c` output before generation and adds it to the model.
#[derive(Debug, Clone, Copy, Default)]
pub struct File2CPlugin;

impl Plugin for File2CPlugin {
    fn name(&self) -> &str {
        FILE2C_KEY
    }

    fn directive_parser(&self) -> Option<Box<dyn DirectiveParser>> {
        Some(Box::new(File2CParser))
    }

    fn pre_generate(&self, context: &mut GenerateContext<'_>) -> Result<(), GenerateError> {
        let model = context.model();
        let directory = context.output_directory().join(FILE2C_DIRECTORY);

        for entry in model
            .plugin_directives::<File2CDirective>()
            .flat_map(|d| &d.files)
        {
            let output = directory.join(&entry.output);
            let changed = context
                .cache()
                .did_input_file_change(&entry.input, entry.metadata().as_bytes());

            if changed {
                let emitter = embed(entry, &output)?;
                context.commit(&emitter)?;
            } else {
                context.logger().trace(&format!(
                    "{} is up to date with {}",
                    output.display(),
                    entry.input.display()
                ));
            }
            context.add_generated_file(output);
        }
        Ok(())
    }
}

fn embed(entry: &EmbeddedFile, output: &Path) -> Result<FileEmitter, GenerateError> {
    let failed = |source| GenerateError::Plugin {
        plugin: FILE2C_KEY.to_string(),
        path: entry.input.clone(),
        source,
    };
    let raw = std::fs::read(&entry.input).map_err(failed)?;
    let uncompressed_size = raw.len();
    let data = entry.compression().apply(raw).map_err(failed)?;

    let mut emitter = FileEmitter::new(output);
    render(entry, &data, uncompressed_size, &mut emitter);
    Ok(emitter)
}

fn render(entry: &EmbeddedFile, data: &[u8], uncompressed_size: usize, out: &mut FileEmitter) {
    let id = &entry.identifier;
    let compressed = entry.compression() != Compression::None;
    let source_name = entry
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    out.append("/* THIS IS AN AUTOMATICALLY GENERATED FILE. DO NOT EDIT! */\n");
    let _ = writeln!(out, "/* Embedded from {source_name} */\n");
    out.append("#include <stddef.h>\n\n");

    let namespaces: Vec<&str> = entry
        .namespace
        .as_deref()
        .map(|ns| ns.split("::").collect())
        .unwrap_or_default();
    for ns in &namespaces {
        let _ = writeln!(out, "namespace {ns} {{");
    }
    if !namespaces.is_empty() {
        out.append("\n");
    }

    let _ = writeln!(out, "extern const unsigned char {id}[];");
    let _ = writeln!(out, "extern const size_t {id}_size;");
    if compressed {
        let _ = writeln!(out, "extern const size_t {id}_uncompressed_size;");
    }
    out.append("\n");

    if data.is_empty() {
        let _ = writeln!(out, "const unsigned char {id}[] = {{ 0 }};");
    } else {
        let _ = writeln!(out, "const unsigned char {id}[] = {{");
        for line in data.chunks(BYTES_PER_LINE) {
            out.append("   ");
            for byte in line {
                let _ = write!(out, " 0x{byte:02x},");
            }
            out.append("\n");
        }
        out.append("};\n");
    }
    let _ = writeln!(out, "const size_t {id}_size = {};", data.len());
    if compressed {
        let _ = writeln!(out, "const size_t {id}_uncompressed_size = {uncompressed_size};");
    }

    if !namespaces.is_empty() {
        out.append("\n");
    }
    for ns in namespaces.iter().rev() {
        let _ = writeln!(out, "}} // namespace {ns}");
    }
}
