//! CLI entry point for inspecting and maintaining vector index files.
//!
//! The index is a library first; this binary only covers the file-level
//! chores around it: initializing a workspace, showing the active settings,
//! and printing or verifying an index file. Both `stats` and `verify` assume
//! the shipped content-hash key type.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;

use vicinity::{ContentHash, IndexError, Settings, VectorIndex};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[derive(Parser)]
#[command(
    name = "vicinity",
    version = env!("CARGO_PKG_VERSION"),
    about = "Embedded nearest-neighbor vector index",
    long_about = "Inspect and maintain vector index files.",
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .vicinity directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    #[command(about = "Display active settings from .vicinity/settings.toml")]
    Config,

    /// Show index file statistics
    #[command(about = "Print format version, dimensions, record count, and metadata")]
    Stats {
        /// Index file to inspect; defaults to the configured index path
        file: Option<PathBuf>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Verify that an index file decodes cleanly
    #[command(about = "Fully decode an index file and report the result")]
    Verify {
        /// Index file to check; defaults to the configured index path
        file: Option<PathBuf>,
    },
}

/// Exit codes following Unix conventions: 0 success, low codes for
/// recoverable conditions scripts may branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 3,
    IoError = 5,
    ConfigError = 6,
    IndexCorrupted = 7,
}

impl ExitCode {
    /// Maps an index error to the exit code scripts should see.
    fn from_error(error: &IndexError) -> Self {
        match error {
            IndexError::UnsupportedVersion { .. } | IndexError::InvalidFormat(_) => {
                Self::IndexCorrupted
            }
            IndexError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => Self::NotFound,
            IndexError::Io(_) => Self::IoError,
            IndexError::DimensionMismatch { .. } | IndexError::InvalidDimension { .. } => {
                Self::GeneralError
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct IndexStats {
    path: String,
    format_version: i32,
    dimensions: usize,
    records: usize,
    metadata: BTreeMap<String, String>,
}

fn main() {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Init { .. }) {
        if let Err(warning) = Settings::check_init() {
            eprintln!("Warning: {warning}");
            eprintln!("Using default configuration for now.");
        }
    }

    let config = if let Some(config_path) = &cli.config {
        Settings::load_from(config_path).unwrap_or_else(|e| {
            eprintln!(
                "Configuration error loading from {}: {e}",
                config_path.display()
            );
            process::exit(ExitCode::ConfigError as i32);
        })
    } else {
        Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            Settings::default()
        })
    };

    init_tracing(cli.verbose || config.debug);

    let code = match cli.command {
        Commands::Init { force } => run_init(force),
        Commands::Config => run_config(&config),
        Commands::Stats { file, json } => {
            run_stats(file.unwrap_or_else(|| config.index_path.clone()), json)
        }
        Commands::Verify { file } => run_verify(file.unwrap_or_else(|| config.index_path.clone())),
    };
    process::exit(code as i32);
}

fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn run_init(force: bool) -> ExitCode {
    match Settings::init_config_file(force) {
        Ok(path) => {
            println!("Created configuration file at: {}", path.display());
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::ConfigError
        }
    }
}

fn run_config(config: &Settings) -> ExitCode {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    match toml::to_string_pretty(config) {
        Ok(toml_str) => {
            println!("{toml_str}");
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error displaying config: {e}");
            ExitCode::GeneralError
        }
    }
}

fn run_stats(path: PathBuf, json: bool) -> ExitCode {
    let index: VectorIndex<ContentHash> = match VectorIndex::load(&path) {
        Ok(index) => index,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from_error(&e);
        }
    };

    let stats = IndexStats {
        path: path.display().to_string(),
        format_version: vicinity::codec::FORMAT_VERSION,
        dimensions: index.dimensions().get(),
        records: index.len(),
        metadata: index
            .metadata_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
    };

    if json {
        match serde_json::to_string_pretty(&stats) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error serializing stats: {e}");
                return ExitCode::GeneralError;
            }
        }
    } else {
        println!("Index file: {}", stats.path);
        println!("  Format version: {}", stats.format_version);
        println!("  Dimensions:     {}", stats.dimensions);
        println!("  Records:        {}", stats.records);
        if stats.metadata.is_empty() {
            println!("  Metadata:       (none)");
        } else {
            println!("  Metadata:");
            for (key, value) in &stats.metadata {
                println!("    {key} = {value}");
            }
        }
    }
    ExitCode::Success
}

fn run_verify(path: PathBuf) -> ExitCode {
    match VectorIndex::<ContentHash>::load(&path) {
        Ok(index) => {
            println!(
                "OK: {} records, {} dimensions",
                index.len(),
                index.dimensions().get()
            );
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("FAILED: {e}");
            ExitCode::from_error(&e)
        }
    }
}
