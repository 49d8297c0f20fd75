//! Listening sockets and accepted connections.
//!
//! [`Server`] and [`Connection`] both distinguish "closed" (the socket was
//! shut down for every process sharing it) from "released" (only this
//! process's handle was dropped). The fork model depends on that: the
//! parent releases each accepted connection and the child releases the
//! listening socket.

use std::fs;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use streamgate_config::connector::ANY_INTERFACE;

#[derive(Debug)]
enum Listener {
    Tcp(TcpListener),
    Unix { listener: UnixListener, path: PathBuf },
}

/// A listening socket, TCP or Unix-domain.
#[derive(Debug)]
pub struct Server {
    listener: Option<Listener>,
}

impl Server {
    /// Listen on `interface:port`. An empty interface means all interfaces.
    pub fn tcp(port: u16, interface: &str, nonblocking: bool) -> io::Result<Self> {
        let interface = if interface.is_empty() {
            ANY_INTERFACE
        } else {
            interface
        };
        let listener = TcpListener::bind((interface, port))?;
        listener.set_nonblocking(nonblocking)?;
        info!(address = %listener.local_addr()?, nonblocking, "listening on TCP socket");
        Ok(Self {
            listener: Some(Listener::Tcp(listener)),
        })
    }

    /// Listen on the Unix socket at `path`, replacing a stale socket file.
    pub fn unix(path: impl Into<PathBuf>, nonblocking: bool) -> io::Result<Self> {
        let path = path.into();
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed stale socket file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        let listener = UnixListener::bind(&path)?;
        listener.set_nonblocking(nonblocking)?;
        info!(path = %path.display(), nonblocking, "listening on unix socket");
        Ok(Self {
            listener: Some(Listener::Unix { listener, path }),
        })
    }

    pub fn connected(&self) -> bool {
        self.listener.is_some()
    }

    /// Switch the listener between blocking and non-blocking accepts.
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        match &self.listener {
            Some(Listener::Tcp(l)) => l.set_nonblocking(nonblocking),
            Some(Listener::Unix { listener, .. }) => listener.set_nonblocking(nonblocking),
            None => Ok(()),
        }
    }

    /// Accept one connection. The accepted stream is always blocking,
    /// whatever mode the listener is in.
    pub fn accept(&self) -> io::Result<Connection> {
        match &self.listener {
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "server socket is closed",
            )),
            Some(Listener::Tcp(listener)) => {
                let (stream, addr) = listener.accept()?;
                stream.set_nonblocking(false)?;
                Ok(Connection {
                    stream: Some(Stream::Tcp(stream)),
                    peer: addr.to_string(),
                })
            }
            Some(Listener::Unix { listener, .. }) => {
                let (stream, _) = listener.accept()?;
                stream.set_nonblocking(false)?;
                Ok(Connection {
                    stream: Some(Stream::Unix(stream)),
                    peer: "unix".to_string(),
                })
            }
        }
    }

    /// Bound address of a TCP listener.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            Some(Listener::Tcp(l)) => l.local_addr().ok(),
            _ => None,
        }
    }

    /// Filesystem path of a Unix listener.
    pub fn socket_path(&self) -> Option<&Path> {
        match &self.listener {
            Some(Listener::Unix { path, .. }) => Some(path),
            _ => None,
        }
    }

    /// Raw descriptor, or -1 once closed or released.
    pub fn handle(&self) -> RawFd {
        match &self.listener {
            Some(Listener::Tcp(l)) => l.as_raw_fd(),
            Some(Listener::Unix { listener, .. }) => listener.as_raw_fd(),
            None => -1,
        }
    }

    /// Stop listening and remove the socket file of a Unix listener.
    pub fn close(&mut self) {
        match self.listener.take() {
            Some(Listener::Unix { listener, path }) => {
                drop(listener);
                if let Err(e) = fs::remove_file(&path) {
                    debug!(path = %path.display(), error = %e, "could not remove socket file");
                }
            }
            Some(Listener::Tcp(listener)) => drop(listener),
            None => {}
        }
    }

    /// Drop this process's handle without touching the socket file.
    pub fn release(&mut self) {
        self.listener.take();
    }
}

enum Stream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

/// One accepted client connection.
pub struct Connection {
    stream: Option<Stream>,
    peer: String,
}

impl Connection {
    pub fn connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Raw descriptor, or -1 once closed or released.
    pub fn handle(&self) -> RawFd {
        match &self.stream {
            Some(Stream::Tcp(s)) => s.as_raw_fd(),
            Some(Stream::Unix(s)) => s.as_raw_fd(),
            None => -1,
        }
    }

    /// Remote address for TCP peers, `unix` for Unix-domain peers.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Shut the connection down in both directions and drop it.
    pub fn close(&mut self) {
        let result = match self.stream.take() {
            Some(Stream::Tcp(s)) => s.shutdown(Shutdown::Both),
            Some(Stream::Unix(s)) => s.shutdown(Shutdown::Both),
            None => return,
        };
        if let Err(e) = result {
            debug!(peer = %self.peer, error = %e, "shutdown failed");
        }
    }

    /// Drop this process's handle; the peer stays connected to whoever else
    /// holds the socket.
    pub fn release(&mut self) {
        self.stream.take();
    }

    fn closed() -> io::Error {
        io::Error::new(io::ErrorKind::NotConnected, "connection is closed")
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.stream {
            Some(Stream::Tcp(s)) => s.read(buf),
            Some(Stream::Unix(s)) => s.read(buf),
            None => Err(Self::closed()),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.stream {
            Some(Stream::Tcp(s)) => s.write(buf),
            Some(Stream::Unix(s)) => s.write(buf),
            None => Err(Self::closed()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.stream {
            Some(Stream::Tcp(s)) => s.flush(),
            Some(Stream::Unix(s)) => s.flush(),
            None => Err(Self::closed()),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("fd", &self.handle())
            .finish()
    }
}
