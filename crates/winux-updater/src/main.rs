//! winux-update - self-update front-end for WINUX
//!
//! Checks the release registry for a newer WINUX build and installs it in
//! place, keeping the previous binary until the new one is in.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    // This must be done before any TLS operations
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = commands::load_config(cli.config.as_deref(), cli.install_dir.as_deref())?;

    match cli.command {
        Commands::Check(args) => commands::check::run(args, config).await,
        Commands::Apply => commands::apply::run(false, config).await,
        Commands::Force => commands::apply::run(true, config).await,
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
