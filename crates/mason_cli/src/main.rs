//! Mason CLI: generate build files from a `project.toml` description.
//!
//! `mason generate` runs one generation pass, `mason generators` lists the
//! available generators, and `mason options` shows the project's
//! enumerations together with the values remembered from the last pass.

#![warn(missing_docs)]

mod generate;
mod options;
mod root;

use std::error::Error;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Mason: one project description, many build systems.
#[derive(Parser, Debug)]
#[command(name = "mason", version, about = "Mason build file generator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory or `project.toml` path. Defaults to the nearest
    /// ancestor of the current directory containing `project.toml`.
    #[arg(short, long, global = true)]
    pub project: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a generation pass.
    Generate(GenerateArgs),
    /// List available generators.
    Generators,
    /// Show project enumerations and remembered selections.
    Options(OptionsArgs),
}

/// Arguments for the `mason generate` subcommand.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Generator to use (default: last used, else `cmake`).
    #[arg(short, long)]
    pub generator: Option<String>,

    /// Target platform (default: last used, else the host platform).
    #[arg(long)]
    pub platform: Option<String>,

    /// Enumeration value for this pass, as `id=value`. Repeatable.
    #[arg(short = 's', long = "set", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Run the generator's build tool after writing files.
    #[arg(long)]
    pub configure: bool,

    /// Print the pass report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `mason options` subcommand.
#[derive(Parser, Debug)]
pub struct OptionsArgs {
    /// Print as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Explicit project location.
    pub project: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        project: cli.project,
    };

    let result = match cli.command {
        Command::Generate(ref args) => generate::run(args, &global),
        Command::Generators => generate::list_generators(&global),
        Command::Options(ref args) => options::run(args, &global),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        process::exit(1);
    }
}

/// Installs the `tracing` subscriber. `RUST_LOG` wins over the flags.
fn init_tracing(quiet: bool, verbose: bool) {
    let default = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Parses `id=value`.
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((id, value)) if !id.is_empty() && !value.is_empty() => {
            Ok((id.to_string(), value.to_string()))
        }
        _ => Err(format!("expected `id=value`, got `{s}`")),
    }
}

/// Boxed error used by command handlers.
pub type CliResult = Result<(), Box<dyn Error>>;
