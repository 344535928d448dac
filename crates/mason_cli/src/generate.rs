//! `mason generate` and `mason generators`.

use std::sync::Arc;

use mason_common::TracingLogger;
use mason_generate::{GeneratorDriver, GeneratorRegistry, PassOptions, PassReport};

use crate::root::resolve_project_root;
use crate::{CliResult, GenerateArgs, GlobalArgs};

/// Loads the project and runs one generation pass.
pub fn run(args: &GenerateArgs, global: &GlobalArgs) -> CliResult {
    let root = resolve_project_root(global)?;
    let driver = GeneratorDriver::new(Arc::new(TracingLogger));
    let project = driver.plugins().loader().load(&root)?;
    tracing::debug!(
        project_file = %project.project_file().display(),
        files = project.files().len(),
        "loaded project"
    );

    let options = PassOptions {
        generator: args.generator.clone(),
        platform: args.platform.clone(),
        overrides: args.set.iter().cloned().collect(),
        run_build_tool: args.configure,
    };

    let report = driver.run(&project, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !global.quiet {
        print_summary(&report, global.verbose);
    }
    Ok(())
}

/// Prints the built-in generators.
pub fn list_generators(global: &GlobalArgs) -> CliResult {
    let registry = GeneratorRegistry::with_builtin();
    let width = registry.names().map(str::len).max().unwrap_or(0);
    for generator in registry.iter() {
        if global.quiet {
            println!("{}", generator.name());
        } else {
            println!(
                "  {:<width$}  {}",
                generator.name(),
                generator.description()
            );
        }
    }
    Ok(())
}

fn print_summary(report: &PassReport, verbose: bool) {
    println!(
        "Generated {} ({} / {}) in {}",
        report.target_name,
        report.generator,
        report.platform,
        report.output_directory.display()
    );
    for (id, resolved) in report.selections.iter() {
        println!("  {id} = {}", resolved.value);
    }
    println!(
        "  {} written, {} unchanged",
        report.written.len(),
        report.kept.len()
    );
    if verbose {
        for path in &report.written {
            println!("  wrote {}", path.display());
        }
    }
}
