//! Sen1Floods11 command-line tool
//!
//! Lists the dataset splits, pre-populates the local cache from the remote
//! store, and prints summaries of decoded examples.
//!
//! # Usage
//!
//! ```bash
//! # Row counts of every split under the current directory
//! sen1floods splits
//!
//! # Fetch and cache the training split through a mirror of the remote store
//! S1F_REMOTE_BACKEND=mirror S1F_REMOTE_MIRROR_ROOT=/mnt/dvc sen1floods warm --split train
//!
//! # Show the first three normalized validation examples
//! sen1floods --context /data/sen1floods11 inspect --split validation --limit 3 --framework
//! ```

mod commands;

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sen1floods_core::{DatasetLoader, LoaderConfig};

/// Sen1Floods11 dataset tool
#[derive(Parser, Debug)]
#[command(name = "sen1floods")]
#[command(about = "List, warm and inspect Sen1Floods11 dataset splits")]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Dataset root, overriding the configuration
    #[arg(long, global = true)]
    context: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every split with its number of examples
    Splits,

    /// Fetch a split's files into the local cache
    Warm {
        /// Split name (train, validation, test, sample)
        #[arg(long)]
        split: String,

        /// Use the framework layout and processing
        #[arg(long)]
        framework: bool,

        /// Fetch everything remotely without writing the cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Print shapes and value ranges of a split's first examples
    Inspect {
        /// Split name (train, validation, test, sample)
        #[arg(long)]
        split: String,

        /// Number of examples to print
        #[arg(long, default_value = "5")]
        limit: usize,

        /// Use the framework layout and processing
        #[arg(long)]
        framework: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut config = match &args.config {
        Some(path) => LoaderConfig::from_file(path)?,
        None => LoaderConfig::default(),
    }
    .with_env_overrides();
    if let Some(context) = args.context {
        config.context = context;
    }

    tracing::debug!("Context: {}", config.context.display());
    tracing::debug!("Remote backend: {:?}", config.remote.backend);

    let loader = DatasetLoader::from_config(config)?;
    let mut out = io::stdout().lock();

    match args.command {
        Command::Splits => commands::splits(&loader, &mut out)?,
        Command::Warm {
            split,
            framework,
            no_cache,
        } => commands::warm(&loader, split.parse()?, framework, no_cache, &mut out)?,
        Command::Inspect {
            split,
            limit,
            framework,
        } => commands::inspect(&loader, split.parse()?, limit, framework, &mut out)?,
    }

    Ok(())
}
