//! tracing subscriber setup driven by the registry's debug level.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use streamgate_config::{OptionRegistry, debug};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Map a numeric debug level (0-10) onto a tracing level.
pub fn level_filter(debug_level: u8) -> LevelFilter {
    match debug_level {
        debug::LEVEL_NONE => LevelFilter::OFF,
        1 | 2 => LevelFilter::ERROR,
        3 => LevelFilter::WARN,
        4 => LevelFilter::INFO,
        5 | 6 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `debug_level` when
/// set. With a `log_file`, output is appended there without colours;
/// otherwise it goes to stderr.
pub fn init(debug_level: u8, log_file: Option<&Path>) -> Result<(), LoggingError> {
    let filter = EnvFilter::builder()
        .with_default_directive(level_filter(debug_level).into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true);

    let result = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::Open {
                    path: path.to_path_buf(),
                    source,
                })?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(io::stderr).try_init(),
    };
    result.map_err(|e| LoggingError::Init(e.to_string()))
}

/// [`init`] from a parsed registry: the process debug level, plus the
/// `logfile` option when registered and non-empty.
pub fn init_from_registry(config: &OptionRegistry) -> Result<(), LoggingError> {
    let log_file = config
        .string("logfile")
        .ok()
        .filter(|f| !f.is_empty())
        .map(PathBuf::from);
    init(debug::level(), log_file.as_deref())
}
