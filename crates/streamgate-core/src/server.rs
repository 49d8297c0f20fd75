//! The connection acceptance engine.
//!
//! Both concurrency models loop while the process is active and the
//! listening socket is open. Accept failures (including "would block" on a
//! non-blocking listener, and EINTR from an arriving signal) pause for
//! [`ACCEPT_RETRY_DELAY`] and retry; no accept error ends the loop. When
//! the loop ends the listening socket is closed and the engine returns 0.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nix::unistd::{ForkResult, fork};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use streamgate_config::{ConfigError, OptionRegistry};

use crate::lifecycle::{self, ActivationSettings};
use crate::paths;
use crate::socket::{Connection, Server};

/// Pause between failed accept attempts.
pub const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(10);

/// How accepted connections are handed to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyModel {
    /// One detached thread per connection.
    Threaded,
    /// One forked child process per connection.
    Forked,
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no listening socket configured: register 'socket' or 'listen_port' and 'listen_interface'")]
    NotConfigured,

    #[error("listen port {0} is outside 0-65535")]
    InvalidPort(i64),

    #[error("could not create socket folder: {0}")]
    TmpFolder(#[source] io::Error),

    #[error("failure to open {what}: {source}")]
    Bind {
        what: String,
        #[source]
        source: io::Error,
    },
}

/// Open the listening socket a parsed registry describes.
///
/// A registered `socket` option wins and names a Unix socket inside
/// [`paths::tmp_folder`]; otherwise `listen_port` and `listen_interface`
/// describe a TCP listener. The socket is non-blocking, so the engines poll
/// it and notice a shutdown signal within one [`ACCEPT_RETRY_DELAY`].
pub fn bind_from_registry(config: &OptionRegistry) -> Result<Server, ServeError> {
    if config.contains("socket") {
        let path: PathBuf = paths::tmp_folder()
            .map_err(ServeError::TmpFolder)?
            .join(config.string("socket")?);
        return Server::unix(&path, true).map_err(|source| ServeError::Bind {
            what: format!("unix socket {}", path.display()),
            source,
        });
    }

    if config.contains("listen_port") && config.contains("listen_interface") {
        let port = config.integer("listen_port")?;
        let port = u16::try_from(port).map_err(|_| ServeError::InvalidPort(port))?;
        let interface = config.string("listen_interface")?;
        return Server::tcp(port, &interface, true).map_err(|source| ServeError::Bind {
            what: format!("TCP socket {interface}:{port}"),
            source,
        });
    }

    Err(ServeError::NotConfigured)
}

/// Bind, activate, and run the chosen engine until shutdown.
///
/// Returns 1 without activating if the socket cannot be opened, otherwise
/// the engine's result.
pub fn serve<H>(config: &OptionRegistry, model: ConcurrencyModel, handler: H) -> i32
where
    H: Fn(&mut Connection) -> i32 + Send + Sync + 'static,
{
    match model {
        ConcurrencyModel::Threaded => serve_threaded(config, handler),
        ConcurrencyModel::Forked => serve_forked(config, handler),
    }
}

/// [`serve`] with one thread per connection.
pub fn serve_threaded<H>(config: &OptionRegistry, handler: H) -> i32
where
    H: Fn(&mut Connection) -> i32 + Send + Sync + 'static,
{
    match prepare(config, ConcurrencyModel::Threaded) {
        Some(server) => thread_server(server, handler),
        None => 1,
    }
}

/// [`serve`] with one child process per connection.
pub fn serve_forked<H>(config: &OptionRegistry, handler: H) -> i32
where
    H: Fn(&mut Connection) -> i32,
{
    match prepare(config, ConcurrencyModel::Forked) {
        Some(server) => fork_server(server, handler),
        None => 1,
    }
}

fn prepare(config: &OptionRegistry, model: ConcurrencyModel) -> Option<Server> {
    let server = match bind_from_registry(config) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failure to open socket");
            return None;
        }
    };
    let cmd = config.string("cmd").unwrap_or_default();
    info!(cmd = %cmd, ?model, "starting connection engine");
    lifecycle::activate(&ActivationSettings::from_registry(config));
    Some(server)
}

/// Put the listener in non-blocking mode. std retries EINTR inside a
/// blocking `accept`, so a blocking listener would never let a shutdown
/// signal reach the loop while the server is idle.
fn poll_mode(server: &Server) {
    if let Err(e) = server.set_nonblocking(true) {
        warn!(error = %e, "could not make listening socket non-blocking");
    }
}

/// Closes the connection when the handler thread finishes, even by panic.
struct ConnectionGuard(Connection);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Accept connections and run `handler` on a detached thread for each.
///
/// The handler's return value is discarded and the connection is closed
/// after it finishes.
pub fn thread_server<H>(mut server: Server, handler: H) -> i32
where
    H: Fn(&mut Connection) -> i32 + Send + Sync + 'static,
{
    poll_mode(&server);
    let handler = Arc::new(handler);
    while lifecycle::is_active() && server.connected() {
        let conn = match server.accept() {
            Ok(conn) => conn,
            Err(e) => {
                back_off(&e);
                continue;
            }
        };

        let fd = conn.handle();
        let handler = Arc::clone(&handler);
        let spawned = thread::Builder::new()
            .name(format!("conn-{fd}"))
            .spawn(move || {
                let mut guard = ConnectionGuard(conn);
                let code = (*handler)(&mut guard.0);
                trace!(fd, code, "connection handler finished");
            });
        match spawned {
            Ok(_) => debug!(fd, "spawned new thread for socket"),
            Err(e) => error!(fd, error = %e, "could not spawn connection thread"),
        }
    }

    server.close();
    debug!("thread server shutting down");
    0
}

/// Accept connections and run `handler` in a forked child for each.
///
/// The child drops its copy of the listening socket, runs the handler,
/// closes the connection and exits with the handler's return value. The
/// parent drops its copy of the connection and keeps accepting. Children
/// are reaped by the SIGCHLD handler [`lifecycle::activate`] installs.
#[allow(unsafe_code)]
pub fn fork_server<H>(mut server: Server, handler: H) -> i32
where
    H: Fn(&mut Connection) -> i32,
{
    poll_mode(&server);
    while lifecycle::is_active() && server.connected() {
        let mut conn = match server.accept() {
            Ok(conn) => conn,
            Err(e) => {
                back_off(&e);
                continue;
            }
        };

        let fd = conn.handle();
        // SAFETY: the child never returns into this loop; it runs the
        // handler on its own copies of the descriptors and exits.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => run_child(&mut server, conn, &handler),
            Ok(ForkResult::Parent { child }) => {
                debug!(fd, pid = child.as_raw(), "forked new process for socket");
                conn.release();
            }
            Err(e) => {
                error!(fd, error = %e, "fork failed");
                conn.close();
            }
        }
    }

    server.close();
    debug!("fork server shutting down");
    0
}

fn run_child<H>(server: &mut Server, mut conn: Connection, handler: &H) -> !
where
    H: Fn(&mut Connection) -> i32,
{
    server.release();
    let code = panic::catch_unwind(AssertUnwindSafe(|| handler(&mut conn))).unwrap_or_else(|_| {
        error!(peer = %conn.peer(), "connection handler panicked");
        1
    });
    conn.close();
    process::exit(code)
}

fn back_off(err: &io::Error) {
    if err.kind() != io::ErrorKind::WouldBlock {
        trace!(error = %err, "accept failed");
    }
    thread::sleep(ACCEPT_RETRY_DELAY);
}
