mod cli;
mod commands;
mod logging;

use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let settings = cli::Settings::parse();
    logging::setup_logging(settings.verbose);
    tracing::debug!("Running {:?}", settings.command);

    let mut stdout = std::io::stdout().lock();
    match commands::run(settings.command, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
