mod cli;
mod config;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan {
            file,
            url,
            send,
            endpoint,
            json,
        } => cli::scan::run(&file, &url, send, endpoint.as_deref(), json).await,
        Commands::Sites => cli::sites::run(),
        Commands::Endpoint { url } => cli::endpoint::run(url.as_deref()),
        Commands::Toggle { name, value } => cli::toggle::run(name.as_deref(), value.as_deref()),
    }
}
