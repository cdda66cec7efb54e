//! mapping-template: render API Gateway mapping templates from the shell.
//!
//! # Usage
//!
//! ```text
//! mapping-template render <TEMPLATE> [-e] [--payload <TEXT> | --payload-file <FILE|->]
//!                         [--query k=v]... [--header k=v]... [--path-param k=v]...
//!                         [--stage-var k=v]... [--context <FILE>] [--escape] [--strict]
//!                         [--max-foreach-iterations <N>]
//! mapping-template check <TEMPLATE> [-e]
//! mapping-template util <FUNCTION> [INPUT]
//! ```
//!
//! `<TEMPLATE>` is a file path (`-` for stdin), or template text with `--inline`.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::{check::CheckArgs, render::RenderArgs, util::UtilArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "mapping-template",
    version,
    about = "Render API Gateway mapping templates against a payload",
    long_about = None,
)]
struct Cli {
    /// Configuration file (default: <config dir>/mapping-template/config.yaml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template against a payload and request parameters.
    Render(RenderArgs),

    /// Parse a template and report syntax errors without rendering.
    Check(CheckArgs),

    /// Run one `$util` helper directly.
    Util(UtilArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Render(args) => args.run(cli.config.as_deref()),
        Commands::Check(args) => args.run(),
        Commands::Util(args) => args.run(),
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
