use std::process::ExitCode;

use spdz_dealer::{cli, flatfile};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let parsed = match cli::parse_args(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    for warning in &parsed.warnings {
        tracing::warn!("{warning}. {}", cli::USAGE);
    }

    match flatfile::generate(&parsed.config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Generating preprocessed data failed: {e}");
            ExitCode::FAILURE
        }
    }
}
