//! `commits-or-clout` entry point

use std::process::ExitCode;

use clap::Parser;
use clout_app::{commands, logging, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = logging::init(cli.log_format) {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("failed to initialise logging: {err}");
        }
        return ExitCode::FAILURE;
    }

    match commands::run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "commits-or-clout failed");
            ExitCode::FAILURE
        }
    }
}
