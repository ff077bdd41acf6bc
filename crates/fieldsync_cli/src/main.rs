//! FieldSync CLI
//!
//! Command-line tools for inspecting a device's FieldSync data
//! directory.
//!
//! # Commands
//!
//! - `status` - Show sync status and queue depth
//! - `pending` - List queued changes awaiting push
//! - `conflicts` - List detected conflicts and their field diffs
//! - `records` - List live or archived records

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// FieldSync command-line inspection tools.
#[derive(Parser)]
#[command(name = "fieldsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory
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
    /// Show sync status and queue depth
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List queued changes awaiting push
    Pending {
        /// Maximum number of entries to list
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List detected conflicts
    Conflicts {
        /// Include resolved conflicts
        #[arg(short, long)]
        all: bool,

        /// Show per-field diffs for each conflict
        #[arg(short, long)]
        diffs: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List live or archived records
    Records {
        /// List the archived set instead of the live set
        #[arg(short, long)]
        archived: bool,

        /// Show one record by id, with its sub-records
        #[arg(short, long)]
        id: Option<uuid::Uuid>,

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
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Status { format } => {
            let path = cli.path.ok_or("Data directory required for status")?;
            commands::status::run(&path, &format)?;
        }
        Commands::Pending { limit, format } => {
            let path = cli.path.ok_or("Data directory required for pending")?;
            commands::pending::run(&path, limit, &format)?;
        }
        Commands::Conflicts { all, diffs, format } => {
            let path = cli.path.ok_or("Data directory required for conflicts")?;
            commands::conflicts::run(&path, all, diffs, &format)?;
        }
        Commands::Records {
            archived,
            id,
            format,
        } => {
            let path = cli.path.ok_or("Data directory required for records")?;
            commands::records::run(&path, archived, id, &format)?;
        }
        Commands::Version => {
            println!("FieldSync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
