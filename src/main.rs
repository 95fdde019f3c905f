use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use covtree::cli;
use covtree::detect::Format;
use covtree::ingest::{self, IngestOptions, Ingested};
use covtree::parsers::ProcessingMode;

/// covtree: read Cobertura, JaCoCo and PIT reports into one coverage tree.
#[derive(Parser)]
#[command(name = "covtree", version, about)]
struct Cli {
    #[command(flatten)]
    options: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalOptions {
    /// Override format detection (cobertura, jacoco, pit).
    #[arg(long, global = true)]
    format: Option<String>,

    /// Return an empty tree instead of failing on reports without data.
    #[arg(long, global = true)]
    ignore_errors: bool,

    /// Turn dotted package names into nested packages.
    #[arg(long, global = true)]
    split_packages: bool,

    /// Print machine-readable JSON where supported.
    #[arg(long, global = true)]
    json: bool,

    /// Log parser progress (same as RUST_LOG=debug).
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the aggregated values of a report.
    Summary {
        /// Path to the report file.
        file: PathBuf,
    },

    /// List per-file line coverage.
    Files {
        /// Path to the report file.
        file: PathBuf,

        /// Sort by coverage rate ascending (show worst files first).
        #[arg(long)]
        sort_by_coverage: bool,
    },

    /// Show line-level counters for a source file.
    Lines {
        /// Path to the report file.
        file: PathBuf,

        /// The source file path (as stored in the report) or its file name.
        source_file: String,

        /// Show only uncovered lines.
        #[arg(long)]
        uncovered: bool,
    },

    /// Print the node hierarchy with coverage per node.
    Tree {
        /// Path to the report file.
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(args.options.verbose);

    let output = match &args.command {
        Commands::Summary { file } => {
            cli::cmd_summary(&load(file, &args.options)?, args.options.json)?
        }
        Commands::Files {
            file,
            sort_by_coverage,
        } => cli::cmd_files(&load(file, &args.options)?, *sort_by_coverage, args.options.json)?,
        Commands::Lines {
            file,
            source_file,
            uncovered,
        } => cli::cmd_lines(&load(file, &args.options)?, source_file, *uncovered)?,
        Commands::Tree { file } => cli::cmd_tree(&load(file, &args.options)?)?,
    };
    print!("{output}");
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env = env_logger::Env::default().filter_or("RUST_LOG", level);
    env_logger::Builder::from_env(env)
        .format_module_path(false)
        .format_target(verbose)
        .init();
}

fn load(file: &Path, options: &GlobalOptions) -> Result<Ingested> {
    let format = options
        .format
        .as_deref()
        .map(str::parse::<Format>)
        .transpose()?;
    let ingest_options = IngestOptions {
        mode: if options.ignore_errors {
            ProcessingMode::IgnoreErrors
        } else {
            ProcessingMode::FailFast
        },
        split_packages: options.split_packages,
    };
    ingest::parse_file(file, format, &ingest_options)
        .with_context(|| format!("Failed to read report {}", file.display()))
}
