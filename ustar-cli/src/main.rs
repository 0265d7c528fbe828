//! ustar CLI - streaming USTAR tar archiver
//!
//! Creates, lists, extracts and verifies POSIX USTAR archives, optionally
//! gzip-compressed.

mod commands;
mod utils;

use clap::{Parser, Subcommand};
use commands::{ListOptions, cmd_create, cmd_extract, cmd_list, cmd_test};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ustar")]
#[command(author, version, about = "Streaming USTAR tar archiver")]
#[command(long_about = "
ustar reads and writes POSIX USTAR tar archives, with optional gzip.

Examples:
  ustar create backup.tar.gz src/ README.md
  ustar list backup.tar.gz -v
  ustar list backup.tar.gz --json -I '*.rs'
  ustar extract backup.tar.gz -o restored/
  ustar test backup.tar.gz
")]
struct Cli {
    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new archive
    #[command(alias = "c")]
    Create {
        /// Output archive file
        archive: PathBuf,

        /// Files and directories to add
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Gzip the archive (implied by a .tar.gz or .tgz name)
        #[arg(short = 'z', long)]
        gzip: bool,

        /// Omit the two zero blocks after the last entry
        #[arg(long)]
        no_end_marker: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List contents of an archive
    #[command(alias = "l")]
    List {
        /// Archive file to list
        archive: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,

        /// Include only entries matching pattern (glob syntax: *.txt, src/**/*)
        #[arg(short = 'I', long)]
        include: Vec<String>,

        /// Exclude entries matching pattern (glob syntax)
        #[arg(short = 'X', long)]
        exclude: Vec<String>,
    },

    /// Extract an archive
    #[command(alias = "x")]
    Extract {
        /// Archive file to extract
        archive: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Test archive integrity
    #[command(alias = "t")]
    Test {
        /// Archive file to test
        archive: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn init_logging(quiet: bool, debug: bool) {
    let level = if quiet {
        log::LevelFilter::Error
    } else if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp(None);
    // RUST_LOG still wins when set
    builder.parse_default_env();
    builder.init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.debug);

    let result = match cli.command {
        Commands::Create {
            archive,
            paths,
            gzip,
            no_end_marker,
            verbose,
        } => cmd_create(&archive, &paths, gzip, !no_end_marker, verbose),
        Commands::List {
            archive,
            verbose,
            json,
            include,
            exclude,
        } => cmd_list(
            &archive,
            &ListOptions {
                verbose,
                json,
                include: &include,
                exclude: &exclude,
            },
        ),
        Commands::Extract {
            archive,
            output,
            verbose,
            progress,
        } => cmd_extract(&archive, &output, verbose, progress),
        Commands::Test { archive, verbose } => cmd_test(&archive, verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
