//! textwire: a batch client/listener for line-oriented text protocols
//!
//! Reads a blob of delimiter-separated messages, connects to the first
//! destination that accepts (or waits for a peer in listen mode), sends each
//! message in turn and copies every response to the output.
//!
//! Features:
//! - Connection retry with a fixed delay, per destination
//! - Bounded readiness waits on every socket operation
//! - Partial-write detection and idle/overall read timeouts
//! - Tunables via an optional TOML file

mod config;
mod destination;
mod error;
mod exchange;
mod logging;
mod message;
mod runtime;
mod session;
mod streams;

use clap::Parser;
use config::{ArgsFailure, CliArgs, Config};
use error::FatalError;
use std::process::ExitCode;
use streams::Output;
use tracing::{error, info};

fn main() -> ExitCode {
    let args: Vec<_> = std::env::args_os().collect();
    let cli = match CliArgs::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => return args_rejected(e, config::quiet_requested(&args)),
    };

    // Logging is needed before the config is resolved so that config
    // errors are reported; the file's log level is applied when it loads.
    let fallback_logging = cli.log_settings();
    let config = Config::from_cli(cli);
    match &config {
        Ok(config) => logging::init(&config.logging),
        Err(_) => logging::init(&fallback_logging),
    }

    let result = config.map_err(FatalError::from).and_then(|config| run(&config));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("[fatal error] {e}");
            ExitCode::FAILURE
        }
    }
}

/// Open the streams, run the session and release everything on return.
fn run(config: &Config) -> Result<(), FatalError> {
    info!(
        destinations = config.destinations.len(),
        conn_retry = config.tunables.conn_retry,
        send_retry = config.tunables.send_retry,
        read_timeout_secs = config.tunables.read_timeout.as_secs(),
        "Starting textwire"
    );

    let input = streams::read_input(config.input.as_deref())?;
    let mut output = Output::open(config.output.as_deref())?;

    let report = session::run(&config.destinations, &input, &mut output, &config.tunables)?;
    output.finish()?;

    match report {
        Some(report) => info!(
            destination = %report.destination,
            bytes = report.bytes,
            "Delivered"
        ),
        None => info!("Finished without a response"),
    }
    Ok(())
}

fn args_rejected(err: clap::Error, quiet: bool) -> ExitCode {
    match config::classify(&err) {
        ArgsFailure::Version => {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        ArgsFailure::Usage => {
            eprintln!("{}", config::usage());
            ExitCode::SUCCESS
        }
        ArgsFailure::Fatal => {
            logging::init(&logging::LogSettings {
                verbosity: if quiet {
                    logging::Verbosity::Off
                } else {
                    logging::Verbosity::Level(0)
                },
                directive: None,
            });
            let message = err.to_string();
            let first = message.lines().next().unwrap_or_default();
            error!("[fatal error] {}", first.trim_start_matches("error: "));
            eprintln!("{}", config::usage());
            ExitCode::FAILURE
        }
    }
}
