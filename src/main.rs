mod app;
mod cli;
mod http;
mod logging;
mod paths;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    logging::init(&cli)?;
    app::run(cli)
}
