//! Marketplace CLI - look up, search and download marketplace plugins and themes

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use marketplace::cli::{self, Cli};

/// Installs the stderr log subscriber; `RUST_LOG` overrides the verbosity flag
fn setup_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.log_filter());

    match cli::run(&cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
