//! repllog CLI
//!
//! Command-line tools for inspecting replication log behavior.
//!
//! # Commands
//!
//! - `replay` - Run a JSON-lines operation script and dump the result
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// repllog command-line tools.
#[derive(Parser)]
#[command(name = "repllog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an operation script against fresh replication state
    Replay {
        /// Path to the JSON-lines script
        script: PathBuf,

        /// Record growth chunk size
        #[arg(short, long)]
        chunk_size: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay {
            script,
            chunk_size,
            format,
        } => {
            commands::replay::run(&script, chunk_size, &format)?;
        }
        Commands::Version => {
            println!("repllog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("repllog Core v{}", repllog_core::VERSION);
        }
    }

    Ok(())
}
