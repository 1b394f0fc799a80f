//! deprisk CLI entry point

use clap::Parser;
use deprisk::cli;
use deprisk::manifest::ManifestError;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit code for a missing or unreadable manifest
const EXIT_MANIFEST: u8 = 2;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("deprisk={}", cli.log_level)));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            if let Some(manifest) = e.downcast_ref::<ManifestError>() {
                eprintln!("error: {}", manifest);
                return ExitCode::from(EXIT_MANIFEST);
            }
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
