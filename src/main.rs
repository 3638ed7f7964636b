mod app;
mod catalog;
mod cli;
mod config;
mod db;
mod error;
mod paths;

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    app::run(cli)
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
