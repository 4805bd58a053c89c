//! feedsync CLI
//!
//! Command-line tools for feedsync cache directories.
//!
//! # Commands
//!
//! - `inspect` - Display cached item and remote key state
//! - `verify` - Verify journal integrity
//! - `dump-journal` - Dump journal records for debugging

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// feedsync cache tools.
#[derive(Parser)]
#[command(name = "feedsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the cache directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display cached item and remote key state
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Verify journal integrity
    Verify,

    /// Dump journal records for debugging
    DumpJournal {
        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Cache path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Cache path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::DumpJournal { limit, format } => {
            let path = cli.path.ok_or("Cache path required for dump-journal")?;
            commands::dump_journal::run(&path, limit, &format)?;
        }
        Commands::Version => {
            println!("feedsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("feedsync core v{}", feedsync_core::VERSION);
        }
    }

    Ok(())
}
