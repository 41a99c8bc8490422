//! Log subscriber setup.
//!
//! All diagnostics go to stderr, one timestamped line per event. `-v` flags
//! raise the threshold one level at a time; `-q` silences everything.

use std::fmt;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

/// Verbosity requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// No output at all.
    Off,
    /// Number of `-v` occurrences.
    Level(u8),
}

impl Verbosity {
    /// 0 → error, 1 → warn, 2 → info, 3 → debug, more → trace.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Off => LevelFilter::OFF,
            Verbosity::Level(0) => LevelFilter::ERROR,
            Verbosity::Level(1) => LevelFilter::WARN,
            Verbosity::Level(2) => LevelFilter::INFO,
            Verbosity::Level(3) => LevelFilter::DEBUG,
            Verbosity::Level(_) => LevelFilter::TRACE,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub verbosity: Verbosity,
    /// Filter directive from the config file, used when no `-v` was given.
    pub directive: Option<String>,
}

impl LogSettings {
    /// Build the filter: quiet wins, then `-v`, then `RUST_LOG`, then the
    /// config file directive, then the error-only default.
    pub fn filter(&self) -> EnvFilter {
        match self.verbosity {
            Verbosity::Off => EnvFilter::default().add_directive(LevelFilter::OFF.into()),
            Verbosity::Level(n) if n > 0 => {
                EnvFilter::default().add_directive(self.verbosity.level_filter().into())
            }
            Verbosity::Level(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                self.directive
                    .as_deref()
                    .and_then(|d| EnvFilter::try_new(d).ok())
                    .unwrap_or_else(|| {
                        EnvFilter::default().add_directive(LevelFilter::ERROR.into())
                    })
            }),
        }
    }
}

/// Local wall-clock timestamp prefix.
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(settings: &LogSettings) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(settings.filter())
        .with_target(false)
        .with_timer(LocalTime)
        .with_writer(std::io::stderr)
        .try_init();
}
