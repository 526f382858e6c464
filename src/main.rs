//! icesheet CLI - Modular glacier simulation
//!
//! `icesheet [run] [--<option> <value>]...` sets up and runs a simulation in
//! the working directory. `list`, `info` and `docs` describe the available
//! modules.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use icesheet::modules::{module_params, write_docs};
use icesheet::params::cli::build_command;
use icesheet::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "icesheet", version, about = "Modular glacier simulation framework")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a simulation (default). Options are given as `--<name> <value>`.
    #[command(disable_help_flag = true)]
    Run {
        /// Option overrides.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
        args: Vec<String>,
    },
    /// List built-in modules and modules found in the working directory.
    List {
        /// Working directory to scan for plugin manifests.
        #[arg(long, default_value = ".")]
        working_dir: PathBuf,
    },
    /// Show detailed info about a module.
    Info {
        /// Module name.
        name: String,
        /// Working directory to search for plugins.
        #[arg(long, default_value = ".")]
        working_dir: PathBuf,
    },
    /// Write one markdown file per built-in module with its options.
    Docs {
        /// Output directory.
        #[arg(default_value = "doc_params")]
        dir: PathBuf,
    },
}

fn main() {
    icesheet::logging::init();

    if let Err(err) = run() {
        eprintln!("❌ {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_from(with_default_command(std::env::args().collect()));
    match cli.command {
        Command::Run { args } => cmd_run(&args),
        Command::List { working_dir } => cmd_list(&working_dir),
        Command::Info { name, working_dir } => cmd_info(&name, &working_dir),
        Command::Docs { dir } => cmd_docs(&dir),
    }
}

/// Insert `run` when the first argument is an option or missing.
fn with_default_command(mut args: Vec<String>) -> Vec<String> {
    let needs_run = match args.get(1) {
        None => true,
        Some(first) => {
            first.starts_with("--") && !matches!(first.as_str(), "--help" | "--version")
        }
    };
    if needs_run {
        args.insert(1, "run".to_string());
    }
    args
}

fn cmd_run(args: &[String]) -> Result<()> {
    if args.iter().any(|a| a == "--help" || a == "-h") {
        return print_run_help();
    }

    let mut simulation = Simulation::setup(args).context("simulation setup failed")?;
    println!(
        "🧊 icesheet v{} | run {} | {}",
        icesheet::VERSION,
        simulation.state().run_id(),
        simulation.pipeline().names().join(" -> ")
    );

    let summary = simulation.run().context("simulation failed")?;

    println!(
        "✅ Complete in {:.2?} ({} iterations)",
        summary.duration, summary.iterations
    );
    for (name, timing) in &summary.stats.module_timings {
        println!("   • {:<16} {:>10.3?}", name, timing.total());
    }
    if let Some(path) = simulation.saved_params() {
        println!("   Parameters saved to {}", path.display());
    }
    Ok(())
}

/// Help listing the core options and those of every built-in module.
fn print_run_help() -> Result<()> {
    let mut schema = ParamRegistry::with_core();
    let registry = ModuleRegistry::with_builtins();
    for (_, entry) in registry.entries() {
        let module = (entry.factory)();
        schema.set_owner(entry.metadata.name.clone());
        module.register_params(&mut schema);
    }
    build_command(&schema)
        .print_long_help()
        .context("print help")?;
    Ok(())
}

fn cmd_list(working_dir: &Path) -> Result<()> {
    let registry = ModuleRegistry::with_builtins();

    println!("Built-in modules ({} total):", registry.len());
    println!();
    for category in Category::all() {
        println!("  📁 {}", category);
        for name in registry.names(*category) {
            if let Some(metadata) = registry.get_metadata(*category, name) {
                println!("      • {} - {}", metadata.name, metadata.description);
            }
        }
        println!();
    }

    let source = WorkingDirSource::new(working_dir);
    let available = source.available();
    println!("Modules in {} ({} total):", source.location(), available.len());
    for name in available {
        println!("      • {}", name);
    }
    Ok(())
}

fn cmd_info(name: &str, working_dir: &Path) -> Result<()> {
    let registry = ModuleRegistry::with_builtins();
    let (module, origin) = match registry.find(name) {
        Some(category) => {
            let module = registry
                .create(category, name)
                .with_context(|| format!("create module '{}'", name))?;
            (module, ModuleOrigin::Builtin(category))
        }
        None => {
            let source = WorkingDirSource::new(working_dir);
            let module = source
                .load(name)
                .with_context(|| format!("load module '{}'", name))?
                .with_context(|| {
                    format!("Module not found: {}. Use 'list' to see available modules.", name)
                })?;
            (module, ModuleOrigin::Extension(source.location()))
        }
    };

    let metadata = module.metadata();
    println!("Module: {}", metadata.name);
    println!("Found in: {}", origin);
    println!("Category: {}", metadata.category);
    println!("Version: {}", metadata.version);
    println!("Author: {}", metadata.author);
    println!();
    println!("Description:");
    println!("  {}", metadata.description);
    println!();

    if metadata.has_dependencies() {
        println!("Dependencies:");
        for dependency in &metadata.dependencies {
            println!("  • {}", dependency);
        }
        println!();
    }

    let capabilities = module.capabilities();
    println!("Capabilities: {}", capabilities);
    if !capabilities.missing().is_empty() {
        println!("  ⚠️  missing: {}", capabilities.missing());
    }
    println!();

    let params = module_params(module.as_ref());
    if !params.is_empty() {
        println!("Parameters:");
        for definition in params.definitions() {
            println!(
                "  • {} [{}] = {}",
                definition.name, definition.value_type, definition.default_value
            );
            if !definition.help.is_empty() {
                println!("    {}", definition.help);
            }
        }
    }
    Ok(())
}

fn cmd_docs(dir: &Path) -> Result<()> {
    let written = write_docs(&ModuleRegistry::with_builtins(), dir)
        .with_context(|| format!("write docs to {}", dir.display()))?;
    println!("📝 Wrote {} files to {}", written.len(), dir.display());
    Ok(())
}
