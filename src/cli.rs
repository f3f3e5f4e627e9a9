/*!
vlcompile Command Line Interface

Compiles view specifications into Vega specifications, or checks that they compile.
*/

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use vlcompile::{compile_str, Compiled, VERSION};

#[derive(Parser)]
#[command(name = "vlcompile")]
#[command(about = "Compile composed view specifications into Vega")]
#[command(version = VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a specification file
    Compile {
        /// Path to the JSON specification, or `-` for stdin
        file: PathBuf,

        /// Output file path
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write compact instead of pretty-printed JSON
        #[arg(long)]
        compact: bool,

        /// Show verbose output (phases, diagnostics)
        #[arg(short, long)]
        verbose: bool,
    },

    /// Compile a specification and report diagnostics without writing output
    Validate {
        /// Path to the JSON specification, or `-` for stdin
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Compile { verbose: true, .. });
    let default_filter = if verbose { "vlcompile=debug" } else { "vlcompile=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compile {
            file,
            output,
            compact,
            verbose,
        } => cmd_compile(&file, output.as_deref(), compact, verbose),
        Commands::Validate { file } => cmd_validate(&file),
    }
}

fn read_input(file: &Path) -> anyhow::Result<String> {
    if file == Path::new("-") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read specification from stdin")?;
        return Ok(input);
    }
    std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file {}", file.display()))
}

fn report(compiled: &Compiled) {
    for diagnostic in &compiled.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }
}

fn cmd_compile(file: &Path, output: Option<&Path>, compact: bool, verbose: bool) -> anyhow::Result<()> {
    if verbose {
        eprintln!("Compiling specification: {}", file.display());
    }

    let input = read_input(file)?;
    let compiled = compile_str(&input).context("Failed to compile specification")?;
    report(&compiled);

    let json_output = if compact {
        serde_json::to_string(&compiled.spec)?
    } else {
        serde_json::to_string_pretty(&compiled.spec)?
    };

    match output {
        None => println!("{}", json_output),
        Some(path) => {
            std::fs::write(path, &json_output)
                .with_context(|| format!("Failed to write to output file {}", path.display()))?;
            if verbose {
                eprintln!("Vega JSON written to: {}", path.display());
            }
        }
    }
    Ok(())
}

fn cmd_validate(file: &Path) -> anyhow::Result<()> {
    let input = read_input(file)?;
    let compiled = compile_str(&input).context("Specification does not compile")?;
    report(&compiled);

    if compiled.diagnostics.is_empty() {
        println!("OK");
    } else {
        println!("OK with {} warning(s)", compiled.diagnostics.len());
    }
    Ok(())
}
