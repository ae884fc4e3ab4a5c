use clap::error::ErrorKind;
use clap::Parser;
use devcluster::{Cli, Error};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit status for a command line that did not parse
///
/// Help and version output are successful runs, including the usage text
/// printed when no command is given.
pub fn parse_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => 1,
    }
}

/// `error[<reason>]: <message>`, the line printed for a failed command
pub fn failure_line(error: &Error) -> String {
    format!("error[{}]: {}", error.reason_code(), error)
}

/// Log filter: `RUST_LOG` wins, then `--verbose`, then info
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    })
}

/// Install the global subscriber; logs go to stderr so stdout stays scriptable
fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot initialize logging: {}", e))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Printing only fails if the terminal is gone
            let _ = e.print();
            return ExitCode::from(parse_exit_code(e.kind()));
        }
    };

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("error: {:#}", e);
        return ExitCode::FAILURE;
    }

    debug!(command = ?cli.command, "Starting devcluster");

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", failure_line(&e));
            ExitCode::from(e.exit_code().clamp(1, 255) as u8)
        }
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
