//! # zipdex CLI
//!
//! Command-line interface for the zipdex archive indexer.
//!
//! ## Commands
//!
//! - `zipdex index [ROOTS...]` - Scan volumes and merge into the index
//! - `zipdex query <pattern>` - Search entries by name
//! - `zipdex status` - Show index statistics
//! - `zipdex archives` - List indexed archives
//! - `zipdex show <id>` - Show one archive and its entries
//! - `zipdex duplicates` - List entries with identical content
//! - `zipdex validate` - Check the index for missing archives and corruption
//! - `zipdex extract <id> <path>` - Copy one entry out of an archive
//! - `zipdex clear` - Delete the index
//!
//! ## Example Usage
//!
//! ```bash
//! # Index every mounted volume
//! zipdex index
//!
//! # Index two roots one after the other, hashing entries
//! zipdex index /mnt/d /mnt/e --sequential --hash
//!
//! # Search for videos
//! zipdex query video_000 --min-size 10M
//! ```

mod app;
mod commands;
mod mounts;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// zipdex - find files inside zip archives across all your drives
#[derive(Parser)]
#[command(name = "zipdex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "ZIPDEX_CONFIG")]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan volumes for zip archives and merge their entries into the index
    Index {
        /// Volume roots to scan (default: every mounted volume)
        roots: Vec<PathBuf>,

        /// Scan volumes one after the other instead of in parallel
        #[arg(short, long)]
        sequential: bool,

        /// Maximum number of worker threads
        #[arg(short, long)]
        workers: Option<usize>,

        /// Record every entry, not just videos
        #[arg(short, long)]
        all_files: bool,

        /// Hash archives and entries (needed for `duplicates`)
        #[arg(long)]
        hash: bool,

        /// Only look for archives in a top-level GoogleTakeout folder
        #[arg(long)]
        takeout: bool,

        /// Give up on a volume after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Search indexed entries by name
    Query {
        /// Search pattern (case-insensitive substring)
        pattern: String,

        /// Treat the pattern as a regular expression
        #[arg(short, long)]
        regex: bool,

        /// Minimum entry size (e.g. 500K, 10M, 1G)
        #[arg(long, value_parser = commands::query::parse_size)]
        min_size: Option<u64>,

        /// Maximum entry size
        #[arg(long, value_parser = commands::query::parse_size)]
        max_size: Option<u64>,

        /// Filter by extension (can be used multiple times)
        #[arg(short, long)]
        ext: Vec<String>,

        /// Maximum number of results to show (default: general.max_results)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Show index status and statistics
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// List indexed archives, most recently discovered first
    Archives {
        /// Maximum number of archives to show
        #[arg(short, long, default_value = "50")]
        limit: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Show one archive and its entries
    Show {
        /// Archive ID (as printed by `archives`)
        id: String,

        /// Only list entries whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// List entries that share the same content hash
    Duplicates {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Check that indexed archives still exist and the index is intact
    Validate {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Copy one entry out of an indexed archive
    Extract {
        /// Archive ID (as printed by `archives`)
        id: String,

        /// Path of the entry inside the archive
        path_in_container: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Clear the index and all data
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => zipdex_core::Config::load_from(path)?,
        None => zipdex_core::Config::load()?,
    };

    // Setup logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.general.log_level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    let verbose = cli.verbose > 0;

    // Execute command
    match cli.command {
        Commands::Index {
            roots,
            sequential,
            workers,
            all_files,
            hash,
            takeout,
            timeout,
        } => commands::index::run(
            config,
            commands::index::IndexOptions {
                roots,
                sequential,
                workers,
                all_files,
                hash,
                takeout,
                timeout,
                verbose,
                quiet: cli.quiet,
            },
        ),
        Commands::Query {
            pattern,
            regex,
            min_size,
            max_size,
            ext,
            limit,
            output,
        } => commands::query::run(
            config,
            commands::query::QueryOptions {
                pattern,
                regex,
                min_size,
                max_size,
                extensions: ext,
                limit,
            },
            output,
        ),
        Commands::Status { output } => commands::status::run(config, output),
        Commands::Archives { limit, output } => commands::archives::run(config, limit, output),
        Commands::Show { id, filter, output } => {
            commands::show::run(config, &id, filter.as_deref(), output)
        }
        Commands::Duplicates { output } => commands::duplicates::run(config, output),
        Commands::Validate { output } => commands::validate::run(config, output),
        Commands::Extract {
            id,
            path_in_container,
            out,
        } => commands::extract::run(config, &id, &path_in_container, &out, verbose),
        Commands::Clear { yes } => commands::clear::run(config, yes),
    }
}
