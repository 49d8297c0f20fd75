#![deny(unsafe_code)]

//! streamgate connector runtime.
//!
//! Turns a parsed [`OptionRegistry`](streamgate_config::OptionRegistry) into
//! a running connector: it opens the listening socket the registry
//! describes, activates the process (privilege drop, daemonization, signal
//! handlers), and hands every accepted connection to a handler, either on
//! its own thread or in its own child process.
//!
//! ```no_run
//! use std::io::Write;
//! use streamgate_config::OptionRegistry;
//! use streamgate_core::{Connection, server};
//!
//! let mut caps = serde_json::json!({});
//! let mut config = OptionRegistry::new("hello", "1.0");
//! config.add_connector_options(8080, &mut caps);
//! config.parse_args_or_exit(std::env::args_os());
//!
//! let code = server::serve_threaded(&config, |conn: &mut Connection| {
//!     match conn.write_all(b"hello\n") {
//!         Ok(()) => 0,
//!         Err(_) => 1,
//!     }
//! });
//! std::process::exit(code);
//! ```

#[cfg(not(unix))]
compile_error!("streamgate-core only supports Unix platforms");

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Activation, signal handling, and the process-wide active flag.
pub mod lifecycle;
/// tracing subscriber setup.
pub mod logging;
/// Executable and temporary-folder locations.
pub mod paths;
/// Switching user and detaching from the terminal.
pub mod privilege;
/// The thread-per-connection and process-per-connection engines.
pub mod server;
/// Listening sockets and accepted connections.
pub mod socket;

pub use lifecycle::{ActivationSettings, activate, is_active};
pub use server::{ConcurrencyModel, ServeError, serve};
pub use socket::{Connection, Server};
