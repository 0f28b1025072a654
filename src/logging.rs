//! Log output setup
//!
//! Logs go to stderr so the report on stdout stays machine readable. With a
//! log file, JSON lines are written there instead through a non-blocking
//! writer whose guard must outlive the scan.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install logger: {0}")]
    Install(String),
}

/// Level of this crate's own events for a `-v` count
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Filter used when `RUST_LOG` is not set; dependencies stay at `warn`
pub fn default_directive(verbose: u8) -> String {
    format!(
        "warn,{}={}",
        env!("CARGO_PKG_NAME").replace('-', "_"),
        level_for_verbosity(verbose)
    )
}

/// Install the global subscriber
pub fn init(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::Open {
                    path: path.to_path_buf(),
                    source,
                })?;
            let (writer, guard) = tracing_appender::non_blocking(file);

            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| LoggingError::Install(e.to_string()))?;

            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init()
                .map_err(|e| LoggingError::Install(e.to_string()))?;

            Ok(None)
        }
    }
}
