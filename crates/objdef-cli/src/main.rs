//! objdef Command-Line Tool
//!
//! Checks class definitions and prints their column layouts and filter
//! conditions.

use std::path::PathBuf;

use clap::Parser;
use objdef_cli::{create_formatter, execute, Command, OutputFormat};
use objdef_core::EngineConfig;

/// objdef Command-Line Tool
#[derive(Parser, Debug)]
#[command(name = "objdef")]
#[command(version, about = "objdef class definition tool")]
pub struct Args {
    /// Engine configuration file (JSON)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", value_enum, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

fn main() {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("objdef=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let formatter = create_formatter(args.format);

    let result = load_config(args.config.as_ref())
        .and_then(|config| execute(&args.command, &config, &*formatter).map_err(Into::into));

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("{}", formatter.format_error(&e.to_string()));
            std::process::exit(1);
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(EngineConfig::from_path(path)?),
        None => Ok(EngineConfig::default()),
    }
}
