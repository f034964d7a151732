use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dwd-poi-ingest")]
#[command(about = "Ingest DWD POI station observations into a PostGIS table")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging (also to stderr)")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        help = "Log file path [default: {log_dir}/LOG_{YYYY_MM_DD__HH_MM}]"
    )]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Prune, fetch, parse and reconcile every registered station
    Run {
        #[arg(short, long, help = "Configuration file (.toml or .ini)")]
        config: PathBuf,

        #[arg(long, help = "Stations processed concurrently [default: from config]")]
        max_workers: Option<usize>,

        #[arg(short, long, help = "Hide the progress bar")]
        quiet: bool,

        #[arg(long, help = "Print the run summary as JSON")]
        json: bool,
    },

    /// Check configuration, station registry and parameter map without fetching
    Validate {
        #[arg(short, long, help = "Configuration file (.toml or .ini)")]
        config: PathBuf,
    },

    /// Parse a saved observation file and show its observations
    Inspect {
        #[arg(short, long, help = "Observation file, e.g. downloads/10147_-BEOB.csv")]
        file: PathBuf,

        #[arg(short, long, help = "Parameter map CSV")]
        parameters: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}
