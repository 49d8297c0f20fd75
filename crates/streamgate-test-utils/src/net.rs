//! Client-side socket helpers.
//!
//! Servers under test start on another thread, so a client may race the
//! bind, and a SIGCHLD from a forked handler can interrupt `connect`. These
//! helpers retry both for a bounded time.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// How long the helpers keep retrying.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn retry<T>(mut attempt: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let deadline = Instant::now() + CONNECT_TIMEOUT;
    loop {
        match attempt() {
            Ok(v) => return Ok(v),
            Err(e) if Instant::now() >= deadline => return Err(e),
            Err(_) => thread::sleep(Duration::from_millis(10)),
        }
    }
}

/// Connect to a TCP server, retrying until [`CONNECT_TIMEOUT`].
pub fn connect_tcp(addr: SocketAddr) -> io::Result<TcpStream> {
    retry(|| TcpStream::connect(addr))
}

/// Connect to a Unix socket, retrying until it exists and accepts.
pub fn connect_unix(path: &Path) -> io::Result<UnixStream> {
    retry(|| UnixStream::connect(path))
}

/// Read until the peer closes, returning the text received.
pub fn read_all(mut stream: impl Read) -> io::Result<String> {
    let mut out = String::new();
    stream.read_to_string(&mut out)?;
    Ok(out)
}
