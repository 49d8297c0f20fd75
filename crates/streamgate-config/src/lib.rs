#![deny(unsafe_code)]

//! Option registry and command-line parsing for streamgate connectors.
//!
//! Every connector declares its settings as named [`OptionDescriptor`]s in
//! an [`OptionRegistry`], then hands the process argv to
//! [`OptionRegistry::parse_args`]. Parsed values accumulate per option, so
//! a repeated flag keeps its whole history while the typed readers
//! ([`string`](OptionRegistry::string), [`integer`](OptionRegistry::integer),
//! [`boolean`](OptionRegistry::boolean)) return the latest value.
//!
//! ```
//! use streamgate_config::OptionRegistry;
//!
//! let mut caps = serde_json::json!({});
//! let mut config = OptionRegistry::new("streamgate-echo", "1.0.0");
//! config.add_connector_options(8080, &mut caps);
//! config.parse_args(["streamgate-echo", "--port", "9000"]).unwrap();
//!
//! assert_eq!(config.integer("listen_port").unwrap(), 9000);
//! assert_eq!(config.string("listen_interface").unwrap(), "0.0.0.0");
//! ```

/// Connector option presets and capability metadata.
pub mod connector;
/// Process-wide debug level written by the parser.
pub mod debug;
/// Option descriptors and argument kinds.
pub mod descriptor;
mod getopt;
/// Argument parsing and its errors.
pub mod parser;
/// The option registry and its typed readers.
pub mod registry;
mod usage;
/// Option values and their conversions.
pub mod value;

pub use descriptor::{ArgKind, OptionDescriptor};
pub use parser::{ParseError, USAGE_EXIT_CODE};
pub use registry::OptionRegistry;
pub use value::OptionValue;

/// Version of the bootstrap library, shown as "Library version" by `--version`.
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit status when code reads an option that was never registered.
pub const UNKNOWN_OPTION_EXIT_CODE: i32 = 37;

/// Errors from registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("a non-existent option '{0}' was accessed")]
    UnknownOption(String),
}

/// Fail-fast access for code that treats a missing option as a programming
/// error rather than something to recover from.
pub trait OrExit<T> {
    /// Unwrap the value, or print a fatal message and exit with
    /// [`UNKNOWN_OPTION_EXIT_CODE`].
    fn or_exit(self) -> T;
}

impl<T> OrExit<T> for Result<T, ConfigError> {
    fn or_exit(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "fatal configuration access");
                println!("Fatal error: {e}.");
                std::process::exit(UNKNOWN_OPTION_EXIT_CODE);
            }
        }
    }
}
