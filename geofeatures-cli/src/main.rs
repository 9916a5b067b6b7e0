//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use eyre::WrapErr;
use geofeatures_cli::CliError;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match geofeatures_cli::run() {
        Ok(()) => Ok(()),
        // Clap renders help, version and usage errors itself.
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            let status = err.status();
            Err(err).wrap_err(format!("geofeatures failed with status {status}"))
        }
    }
}
