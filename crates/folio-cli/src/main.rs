use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Folio CLI - inspect and edit a folio document store", long_about = None)]
struct Cli {
    /// Store file (defaults to the platform data directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show capacity usage and every stored record
    Status,
    /// Describe a record without migrating it
    Inspect { key: String },
    /// Print a record as JSON, migrating it if it is older
    Get { key: String },
    /// Store the JSON in FILE under KEY
    Put {
        key: String,
        file: PathBuf,
        /// Schema version to tag the record with (defaults to current)
        #[arg(long)]
        version: Option<u32>,
    },
    /// List migration backups of a record, oldest first
    Backups { key: String },
    /// Show the effective storage configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        write: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "folio=debug" } else { "folio=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = commands::Context::open(cli.store, cli.config)?;

    match cli.command {
        Commands::Status => commands::status::run(&ctx)?,
        Commands::Inspect { key } => commands::record::inspect(&ctx, &key)?,
        Commands::Get { key } => commands::record::get(&ctx, &key)?,
        Commands::Put { key, file, version } => commands::record::put(&ctx, &key, &file, version)?,
        Commands::Backups { key } => commands::backups::run(&ctx, &key)?,
        Commands::Config { write } => commands::config::run(&ctx, write)?,
    }

    Ok(())
}
