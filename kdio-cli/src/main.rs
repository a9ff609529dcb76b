mod inspect;
mod sample;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use kdio::store::FileSystemStore;
use kdio::{Layout, PrimitiveValues, relayout};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use crate::inspect::{exec_dump, exec_inspect};
use crate::sample::{SampleArgs, exec_sample};

#[derive(clap::Parser)]
#[command(version, about)]
struct Cli {
    /// Log more; repeat for debug and trace output.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Write a reproducible random point set with colour values.
    Sample {
        /// Directory of the block store, created if missing.
        root: PathBuf,
        /// Group to write the point set to.
        path: String,
        #[command(flatten)]
        args: SampleArgs,
    },
    /// Print the metadata of a stored point set.
    Inspect { root: PathBuf, path: String },
    /// Print the points of a stored point set.
    Dump {
        root: PathBuf,
        path: String,
        /// Print at most this many points.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Copy a stored point set to a new group using another layout.
    Relayout {
        root: PathBuf,
        source: String,
        destination: String,
        #[arg(short, long)]
        layout: Layout,
    },
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logging(verbose: u8) -> anyhow::Result<()> {
    TermLogger::init(
        log_level(verbose),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Sample { root, path, args } => {
            let store = FileSystemStore::open_or_create(root)?;
            exec_sample(&store, &path, &args)?;
        }
        Commands::Inspect { root, path } => {
            exec_inspect(&FileSystemStore::open(root)?, &path)?;
        }
        Commands::Dump { root, path, limit } => {
            exec_dump(&FileSystemStore::open(root)?, &path, limit)?;
        }
        Commands::Relayout {
            root,
            source,
            destination,
            layout,
        } => {
            let store = FileSystemStore::open(root)?;
            let codec = PrimitiveValues::<u32>::new();
            let info = relayout(&store, &source, &destination, layout, &codec, &codec)?;
            println!(
                "Copied {} to {} ({} layout, {} points)",
                source,
                info.path(),
                info.layout(),
                info.num_points()
            );
        }
    }

    Ok(())
}
