// Orcinus CLI Tool
//
// Command-line interface for the Orcinus compiler front-end.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orcinus_compiler_core::diagnostic::format_diagnostic_colored;
use orcinus_compiler_core::semantic::{dump_module, SemanticContext};
use orcinus_compiler_core::{Document, FileWorkspace};

#[derive(Parser)]
#[command(name = "orcc")]
#[command(about = "Orcinus language compiler front-end", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an Orcinus source file for errors
    Check {
        /// Input Orcinus file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Emit diagnostics as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Analyze a file and print its typed symbol graph
    Dump {
        /// Input Orcinus file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check { input, json } => check(&input, json),
        Commands::Dump { input } => dump(&input),
        Commands::Version => {
            println!("orcc {}", env!("CARGO_PKG_VERSION"));
            println!("orcinus-compiler-core {}", orcinus_compiler_core::VERSION);
            Ok(())
        }
    }
}

/// Open the file as a document and analyze it with its directory as the
/// workspace root (imports resolve to sibling `.orx` files)
fn analyze(input: &Path) -> Result<(SemanticContext<FileWorkspace>, orcinus_compiler_core::semantic::ModuleId)> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("failed to read input file: {}", input.display()))?;
    let name = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string());
    let root = input.parent().unwrap_or_else(|| Path::new("."));

    let workspace = FileWorkspace::new(root);
    let document = Document::new(input.to_string_lossy().into_owned(), name, source);
    let mut ctx = SemanticContext::new(workspace);
    let module = ctx.open(&document);
    Ok((ctx, module))
}

fn check(input: &Path, json: bool) -> Result<()> {
    let (ctx, _) = analyze(input)?;

    if json {
        println!("{}", ctx.diagnostics.to_json());
    } else {
        let sources = ctx.source_map();
        for diagnostic in ctx.diagnostics.iter() {
            print!("{}", format_diagnostic_colored(diagnostic, &sources));
        }
    }

    let errors = ctx.diagnostics.error_count();
    if errors > 0 {
        anyhow::bail!("{} error(s) found in {}", errors, input.display());
    }
    println!("{} OK", input.display());
    Ok(())
}

fn dump(input: &Path) -> Result<()> {
    let (ctx, module) = analyze(input)?;

    let sources = ctx.source_map();
    for diagnostic in ctx.diagnostics.iter() {
        eprint!("{}", format_diagnostic_colored(diagnostic, &sources));
    }

    print!("{}", dump_module(ctx.symbols(), module));
    Ok(())
}
