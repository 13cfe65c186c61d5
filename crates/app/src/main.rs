//! Storefront CLI

use std::process;

use clap::Parser;

use crate::cli::Cli;

mod cli;
mod observability;

#[tokio::main]
#[expect(
    clippy::exit,
    reason = "the CLI reports failures through its exit status"
)]
pub async fn main() {
    _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(error) = observability::init_subscriber(&cli.config.logging) {
        eprintln!("{error}");
        process::exit(1);
    }

    if let Err(error) = cli.run().await {
        eprintln!("{error}");
        process::exit(1);
    }
}
