use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// NSE F&O history fetcher — pulls per-instrument futures history and writes
/// one spreadsheet per symbol.
#[derive(Parser)]
#[command(name = "fno-history", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch history for every configured instrument
    Fetch {
        /// JSON config file (see `fno-history schema`)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for spreadsheets and summary.json [default: spreadsheets]
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Days of history ending at --to [default: 30]
        #[arg(long)]
        days: Option<u32>,

        /// Last day of the window as dd-mm-yyyy [default: today]
        #[arg(long)]
        to: Option<String>,

        /// Contract expiry as dd-Mon-yyyy, e.g. 29-Jul-2021
        #[arg(long)]
        expiry: Option<String>,

        /// Instrument type query value [default: FUTSTK]
        #[arg(long)]
        instrument_type: Option<String>,

        /// Comma-separated symbols to fetch instead of the configured universe
        #[arg(long, value_delimiter = ',')]
        symbols: Option<Vec<String>>,

        /// Per-request timeout in seconds [default: 10]
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Maximum instruments in flight at once (default: unbounded)
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Exit 0 even if some instruments failed
        #[arg(long)]
        no_strict: bool,
    },

    /// List the instrument universe that `fetch` would use
    Instruments {
        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the output column layout
    Columns,

    /// Output the JSON schema for the config file
    Schema,
}
