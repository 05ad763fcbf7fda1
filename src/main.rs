use anyhow::Result;
use clap::Parser;

mod app;
mod cli;
mod config;
mod error;
mod format;
mod logging;
mod mail;
mod report;
mod search;
mod source;
mod target;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    logging::init(cli.verbose);

    app::run(cli).await
}
