pub mod endpoint;
pub mod scan;
pub mod sites;
pub mod toggle;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "prk",
    about = "Scan point-history pages and send the records to the ingest endpoint",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract transactions from a saved history page
    Scan {
        /// Saved HTML file of the history page
        file: PathBuf,
        /// The page's original URL, used to select the source
        #[arg(long)]
        url: String,
        /// Post the extracted batch to the configured ingest endpoint
        #[arg(long)]
        send: bool,
        /// Override the configured endpoint for this call
        #[arg(long)]
        endpoint: Option<String>,
        /// Print the raw records as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the supported sources and their URL patterns
    Sites,
    /// Show or set the persisted ingest endpoint
    Endpoint {
        /// New endpoint URL (shows the current one if omitted)
        url: Option<String>,
    },
    /// Show or set a per-source scan toggle
    Toggle {
        /// Toggle name, e.g. includeVPointInvestment (lists all if omitted)
        name: Option<String>,
        /// New value: on or off
        value: Option<String>,
    },
}
