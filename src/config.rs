//! Configuration module for textwire.
//!
//! The command line selects what to talk to; an optional TOML file tunes
//! how patiently to talk. Timeouts and retry counts are not flags.

use crate::destination::{Destination, DestinationError};
use crate::logging::{LogSettings, Verbosity};
use crate::message::DEFAULT_DELIMITER;
use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "textwire")]
#[command(author = "textwire authors")]
#[command(version = "0.1.0")]
#[command(
    about = "Send delimited messages to text-protocol servers and collect the replies",
    long_about = None
)]
pub struct CliArgs {
    /// Input file holding the messages (defaults to standard input)
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Output file for the responses (defaults to standard output)
    #[arg(short = 'w', long = "write", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Listen on PORT and accept one peer instead of dialing out
    #[arg(short = 'l', long = "listen", value_name = "PORT")]
    pub listen: Option<u16>,

    /// Increase verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Disable all log output, fatal errors included
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Path to TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Destinations as host:port, tried in order until one answers
    #[arg(value_name = "DESTINATION")]
    pub destinations: Vec<String>,
}

impl CliArgs {
    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            verbosity: if self.quiet {
                Verbosity::Off
            } else {
                Verbosity::Level(self.verbose)
            },
            directive: None,
        }
    }
}

/// How a rejected command line should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgsFailure {
    /// `--version`: print it and exit successfully.
    Version,
    /// `--help` or malformed arguments: print usage and exit successfully.
    Usage,
    /// An option is missing its value: fatal.
    Fatal,
}

/// Classify a clap parse error.
pub fn classify(err: &clap::Error) -> ArgsFailure {
    match err.kind() {
        ErrorKind::DisplayVersion => ArgsFailure::Version,
        ErrorKind::InvalidValue | ErrorKind::MissingRequiredArgument => ArgsFailure::Fatal,
        _ => ArgsFailure::Usage,
    }
}

/// Usage message shown for `--help` and for malformed arguments alike.
pub fn usage() -> String {
    CliArgs::command().render_help().to_string()
}

/// Whether `-q` appears on a command line that clap rejected.
///
/// Only whole `-q`/`--quiet` words and flag bundles made of `v` and `q`
/// count, so a value such as `-fq` (input file `q`) is not mistaken for it.
pub fn quiet_requested<I, S>(args: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    args.into_iter().skip(1).any(|arg| {
        let Some(arg) = arg.as_ref().to_str() else {
            return false;
        };
        if arg == "--quiet" {
            return true;
        }
        match arg.strip_prefix('-') {
            Some(flags) if !flags.starts_with('-') => {
                flags.contains('q') && flags.chars().all(|c| c == 'q' || c == 'v')
            }
            _ => false,
        }
    })
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub io: IoConfig,
    #[serde(default)]
    pub message: MessageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection retry settings
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// Total connection attempts per destination
    #[serde(default = "default_conn_retry")]
    pub conn_retry: u32,
    /// Delay between connection attempts in seconds
    #[serde(default = "default_conn_retry_delay")]
    pub conn_retry_delay: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            conn_retry: default_conn_retry(),
            conn_retry_delay: default_conn_retry_delay(),
        }
    }
}

/// Socket I/O settings
#[derive(Debug, Deserialize)]
pub struct IoConfig {
    /// Writability checks per message
    #[serde(default = "default_send_retry")]
    pub send_retry: u32,
    /// Connect timeout and per-socket idle read timeout in seconds
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout: u64,
    /// Overall read timeout in seconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout: u64,
    /// Maximum wait for one readiness check in seconds
    #[serde(default = "default_select_wait")]
    pub select_wait: u64,
    /// Bytes requested per read call
    #[serde(default = "default_read_chunk")]
    pub read_chunk: usize,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            send_retry: default_send_retry(),
            socket_timeout: default_socket_timeout(),
            read_timeout: default_read_timeout(),
            select_wait: default_select_wait(),
            read_chunk: default_read_chunk(),
        }
    }
}

/// Input framing settings
#[derive(Debug, Deserialize)]
pub struct MessageConfig {
    /// Literal token separating messages in the input
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Default)]
pub struct LoggingConfig {
    /// Filter directive used when no -v flag is given (e.g. "debug")
    pub level: Option<String>,
}

fn default_conn_retry() -> u32 {
    3
}

fn default_conn_retry_delay() -> u64 {
    15
}

fn default_send_retry() -> u32 {
    2
}

fn default_socket_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    60
}

fn default_select_wait() -> u64 {
    5
}

fn default_read_chunk() -> usize {
    1500
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

/// Retry budgets and timeouts used by the I/O engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tunables {
    pub conn_retry: u32,
    pub conn_retry_delay: Duration,
    pub send_retry: u32,
    pub socket_timeout: Duration,
    pub read_timeout: Duration,
    pub select_wait: Duration,
    pub read_chunk: usize,
    pub delimiter: String,
}

impl Default for Tunables {
    fn default() -> Self {
        Tunables::from_toml(&TomlConfig::default())
    }
}

impl Tunables {
    fn from_toml(toml: &TomlConfig) -> Self {
        Self {
            // A zero budget would never attempt anything.
            conn_retry: toml.session.conn_retry.max(1),
            conn_retry_delay: Duration::from_secs(toml.session.conn_retry_delay),
            send_retry: toml.io.send_retry.max(1),
            socket_timeout: Duration::from_secs(toml.io.socket_timeout.max(1)),
            read_timeout: Duration::from_secs(toml.io.read_timeout),
            select_wait: Duration::from_secs(toml.io.select_wait),
            read_chunk: toml.io.read_chunk.max(1),
            delimiter: toml.message.delimiter.clone(),
        }
    }

    /// Millisecond-scale values so socket tests finish quickly.
    #[cfg(test)]
    pub fn fast() -> Self {
        Self {
            conn_retry: 3,
            conn_retry_delay: Duration::from_millis(10),
            send_retry: 2,
            socket_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_millis(400),
            select_wait: Duration::from_millis(200),
            read_chunk: 1500,
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub destinations: Vec<Destination>,
    pub tunables: Tunables,
    pub logging: LogSettings,
}

impl Config {
    /// Resolve parsed arguments and the optional TOML file.
    pub fn from_cli(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let destinations = match cli.listen {
            Some(port) => {
                if cli.destinations.len() > 1 {
                    return Err(ConfigError::ListenWithMultipleDestinations);
                }
                vec![Destination::listen_on(
                    cli.destinations.first().map(String::as_str),
                    port,
                )?]
            }
            None => {
                if cli.destinations.is_empty() {
                    return Err(ConfigError::MissingDestination);
                }
                cli.destinations
                    .iter()
                    .map(|arg| Destination::parse(arg))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let mut logging = cli.log_settings();
        if cli.verbose == 0 {
            logging.directive = toml_config.logging.level.clone();
        }

        Ok(Config {
            input: cli.input,
            output: cli.output,
            destinations,
            tunables: Tunables::from_toml(&toml_config),
            logging,
        })
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    TomlParse(PathBuf, #[source] toml::de::Error),
    #[error("at least one destination (host:port) is required unless -l is given")]
    MissingDestination,
    #[error("listen mode accepts at most one destination")]
    ListenWithMultipleDestinations,
    #[error(transparent)]
    Destination(#[from] DestinationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("textwire").chain(args.iter().copied()))
    }

    #[test]
    fn test_default_tunables() {
        let tunables = Tunables::default();
        assert_eq!(tunables.conn_retry, 3);
        assert_eq!(tunables.conn_retry_delay, Duration::from_secs(15));
        assert_eq!(tunables.send_retry, 2);
        assert_eq!(tunables.socket_timeout, Duration::from_secs(10));
        assert_eq!(tunables.read_timeout, Duration::from_secs(60));
        assert_eq!(tunables.select_wait, Duration::from_secs(5));
        assert_eq!(tunables.read_chunk, 1500);
        assert_eq!(tunables.delimiter, "__END_MSG__");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [session]
            conn_retry = 5
            conn_retry_delay = 2

            [io]
            read_timeout = 30
            read_chunk = 4096

            [message]
            delimiter = "---"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        let tunables = Tunables::from_toml(&config);
        assert_eq!(tunables.conn_retry, 5);
        assert_eq!(tunables.conn_retry_delay, Duration::from_secs(2));
        assert_eq!(tunables.read_timeout, Duration::from_secs(30));
        assert_eq!(tunables.read_chunk, 4096);
        // Unset keys keep their defaults.
        assert_eq!(tunables.select_wait, Duration::from_secs(5));
        assert_eq!(tunables.delimiter, "---");
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_zero_budgets_clamped() {
        let config: TomlConfig = toml::from_str("[session]\nconn_retry = 0\n").unwrap();
        assert_eq!(Tunables::from_toml(&config).conn_retry, 1);
    }

    #[test]
    fn test_cli_destinations() {
        let cli = parse(&["-v", "-v", "-f", "in.txt", "10.0.0.1:9000", "10.0.0.2:9000"]).unwrap();
        assert_eq!(cli.verbose, 2);

        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.input, Some(PathBuf::from("in.txt")));
        assert_eq!(config.output, None);
        assert_eq!(config.destinations.len(), 2);
        assert_eq!(config.destinations[1].to_string(), "10.0.0.2:9000");
        assert_eq!(config.logging.verbosity, Verbosity::Level(2));
    }

    #[test]
    fn test_listen_without_destination_is_valid() {
        let config = Config::from_cli(parse(&["-l", "9999"]).unwrap()).unwrap();
        assert_eq!(
            config.destinations,
            vec![Destination::Listen {
                host: "0.0.0.0".to_string(),
                port: 9999
            }]
        );
    }

    #[test]
    fn test_listen_with_several_destinations_rejected() {
        let result = Config::from_cli(parse(&["-l", "9999", "a:1", "b:2"]).unwrap());
        assert!(matches!(
            result,
            Err(ConfigError::ListenWithMultipleDestinations)
        ));
    }

    #[test]
    fn test_missing_destination() {
        let result = Config::from_cli(parse(&["-v"]).unwrap());
        assert!(matches!(result, Err(ConfigError::MissingDestination)));
    }

    #[test]
    fn test_bad_destination() {
        let result = Config::from_cli(parse(&["localhost"]).unwrap());
        assert!(matches!(result, Err(ConfigError::Destination(_))));
    }

    #[test]
    fn test_quiet_disables_logging() {
        let config = Config::from_cli(parse(&["-q", "h:1"]).unwrap()).unwrap();
        assert_eq!(config.logging.verbosity, Verbosity::Off);
    }

    #[test]
    fn test_config_file_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("textwire.toml");
        std::fs::write(&path, "[io]\nsend_retry = 4\n[logging]\nlevel = \"trace\"\n").unwrap();

        let cli = parse(&["-c", path.to_str().unwrap(), "h:1"]).unwrap();
        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.tunables.send_retry, 4);
        assert_eq!(config.logging.directive.as_deref(), Some("trace"));
    }

    #[test]
    fn test_missing_config_file() {
        let cli = parse(&["-c", "/nonexistent/textwire.toml", "h:1"]).unwrap();
        assert!(matches!(
            Config::from_cli(cli),
            Err(ConfigError::FileRead(_, _))
        ));
    }

    #[test]
    fn test_classify_parse_errors() {
        assert_eq!(classify(&parse(&["--help"]).unwrap_err()), ArgsFailure::Usage);
        assert_eq!(classify(&parse(&["--version"]).unwrap_err()), ArgsFailure::Version);
        assert_eq!(classify(&parse(&["--bogus"]).unwrap_err()), ArgsFailure::Usage);
        assert_eq!(classify(&parse(&["-l", "http"]).unwrap_err()), ArgsFailure::Usage);
        assert_eq!(classify(&parse(&["h:1", "-f"]).unwrap_err()), ArgsFailure::Fatal);
    }

    #[test]
    fn test_usage_lists_every_flag() {
        let text = usage();
        assert!(text.contains("textwire"));
        for flag in ["--file", "--write", "--listen", "--verbose", "--quiet", "--config"] {
            assert!(text.contains(flag), "usage lacks {flag}");
        }
    }

    #[test]
    fn test_quiet_requested_on_rejected_args() {
        assert!(quiet_requested(["textwire", "-q", "h:1", "-f"]));
        assert!(quiet_requested(["textwire", "--quiet", "-f"]));
        assert!(quiet_requested(["textwire", "-vq", "-w"]));
        assert!(!quiet_requested(["textwire", "-fq"]));
        assert!(!quiet_requested(["textwire", "-v", "h:1", "-f"]));
        // The program name is never a flag.
        assert!(!quiet_requested(["-q"]));
    }
}
