//! `mason options`: enumerations declared by the project and the values
//! remembered by the last committed pass.

use std::sync::Arc;

use serde::Serialize;

use mason_cache::BuildCache;
use mason_common::{Logger, TracingLogger};
use mason_generate::driver::{GENERATOR_OPTION, PLATFORM_OPTION};
use mason_generate::PluginRegistry;
use mason_project::{enumeration_option_key, Enumeration, Project};

use crate::root::resolve_project_root;
use crate::{CliResult, GlobalArgs, OptionsArgs};

#[derive(Debug, Serialize)]
struct OptionsReport<'a> {
    generator: Option<String>,
    platform: Option<String>,
    enumerations: Vec<EnumerationRow<'a>>,
}

#[derive(Debug, Serialize)]
struct EnumerationRow<'a> {
    id: &'a str,
    title: &'a str,
    values: Vec<&'a str>,
    default: Option<&'a str>,
    remembered: Option<String>,
    remembered_label: Option<&'a str>,
}

/// Prints the project's enumerations.
pub fn run(args: &OptionsArgs, global: &GlobalArgs) -> CliResult {
    let root = resolve_project_root(global)?;
    let project = PluginRegistry::with_builtin().loader().load(&root)?;
    tracing::debug!(root = %root.display(), files = project.files().len(), "loaded project");
    let logger: Arc<dyn Logger> = Arc::new(TracingLogger);
    let report = collect(&project, logger);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "generator: {}",
        report.generator.as_deref().unwrap_or("(not set)")
    );
    println!(
        "platform:  {}",
        report.platform.as_deref().unwrap_or("(not set)")
    );
    for row in &report.enumerations {
        println!();
        match row.remembered_label {
            Some(label) => println!("{} ({}): {label}", row.id, row.title),
            None => println!("{} ({})", row.id, row.title),
        }
        for value in &row.values {
            let mut marks = Vec::new();
            if row.remembered.as_deref() == Some(*value) {
                marks.push("current");
            }
            if row.default == Some(*value) {
                marks.push("default");
            }
            if marks.is_empty() {
                println!("  {value}");
            } else {
                println!("  {value} [{}]", marks.join(", "));
            }
        }
    }
    Ok(())
}

/// Reads remembered values without modifying the cache.
fn collect(project: &Project, logger: Arc<dyn Logger>) -> OptionsReport<'_> {
    let mut cache = BuildCache::new(&project.build_directory(), logger);
    let generator = cache.get_option(GENERATOR_OPTION);
    let platform = cache.get_option(PLATFORM_OPTION);
    let enumerations = project
        .enumerations()
        .into_iter()
        .map(|enumeration| row(enumeration, &mut cache))
        .collect();
    cache.rollback_safe();

    OptionsReport {
        generator,
        platform,
        enumerations,
    }
}

fn row<'a>(enumeration: &'a Enumeration, cache: &mut BuildCache) -> EnumerationRow<'a> {
    let remembered = cache
        .get_option(&enumeration_option_key(&enumeration.id))
        .filter(|value| enumeration.contains(value));
    let remembered_label = remembered
        .as_deref()
        .and_then(|value| enumeration.label(value));
    EnumerationRow {
        id: &enumeration.id,
        title: &enumeration.title,
        values: enumeration.values.iter().map(|(v, _)| v.as_str()).collect(),
        default: enumeration.default.as_deref(),
        remembered,
        remembered_label,
    }
}
