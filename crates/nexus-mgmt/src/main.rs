#![warn(missing_docs)]

//! `nexus-mgmt` entry point.

use anyhow::Result;
use clap::Parser;
use nexus_mgmt::cli::Cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout belongs to the console and demo output.
    tracing_subscriber::registry()
        .with(
            cli.log_json
                .then(|| fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!cli.log_json).then(|| fmt::layer().with_writer(std::io::stderr)),
        )
        .with(EnvFilter::from_default_env())
        .init();

    tracing::info!("DFS Nexus management CLI starting...");

    cli.run().await
}
