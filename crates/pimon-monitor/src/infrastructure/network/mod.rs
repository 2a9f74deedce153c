//! Network infrastructure for the monitor.
//!
//! - [`MonitorListener`] binds the listening socket (backlog 1, a single
//!   reporter) and accepts with a bounded timeout.
//! - [`PeerLink`] owns the accepted connection and reads from it with a
//!   bounded timeout into a fixed 1 KiB buffer.
//!
//! # Read timeout
//!
//! Both `accept_within` and `receive_within` give up after the configured
//! receive timeout (one second by default).  An expired timeout is reported
//! as "nothing happened" rather than as an error, which lets the caller's
//! loop refresh its display and check for a stop request before waiting
//! again.  Both underlying operations are cancel-safe, so no connection or
//! bytes are lost when a timeout fires.
//!
//! Sockets are released when the owning value is dropped.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{lookup_host, TcpListener, TcpSocket, TcpStream};
use tokio::time;
use tracing::{debug, info};

/// Size of the per-read receive buffer.
pub const RECEIVE_BUFFER_SIZE: usize = 1024;

/// Only one reporter is ever served.
const LISTEN_BACKLOG: u32 = 1;

/// Error type for the monitor's sockets.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The listen address could not be resolved.
    #[error("could not resolve listen address {endpoint}: {source}")]
    Resolve {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Creating, binding or listening on the socket failed.
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// An accept or read failed with something other than a timeout.
    #[error("connection I/O error: {0}")]
    Io(#[from] io::Error),
}

// ── Listener ──────────────────────────────────────────────────────────────────

/// The monitor's listening socket.
#[derive(Debug)]
pub struct MonitorListener {
    listener: TcpListener,
}

impl MonitorListener {
    /// Resolves `host:port` and listens on the first address with a backlog
    /// of one.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Resolve`] if the name does not resolve and
    /// [`NetworkError::BindFailed`] if the socket cannot be set up.
    pub async fn bind(host: &str, port: u16) -> Result<Self, NetworkError> {
        let endpoint = format!("{host}:{port}");
        let addr = lookup_host((host, port))
            .await
            .and_then(|mut addrs| {
                addrs
                    .next()
                    .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses found"))
            })
            .map_err(|source| NetworkError::Resolve { endpoint, source })?;

        let bind_failed = |source: io::Error| NetworkError::BindFailed { addr, source };
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_failed)?;
        // Lets a restarted monitor reuse the port while the old connection
        // sits in TIME_WAIT.
        #[cfg(not(windows))]
        socket.set_reuseaddr(true).map_err(bind_failed)?;
        socket.bind(addr).map_err(bind_failed)?;
        let listener = socket.listen(LISTEN_BACKLOG).map_err(bind_failed)?;

        info!("listening on {}", listener.local_addr().unwrap_or(addr));
        Ok(Self { listener })
    }

    /// The address actually bound (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Io`] if the OS cannot report the address.
    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        Ok(self.listener.local_addr()?)
    }

    /// Waits at most `timeout` for a reporter to connect.
    ///
    /// Returns `Ok(None)` if the timeout expired.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Io`] if `accept` fails.
    pub async fn accept_within(
        &self,
        timeout: Duration,
    ) -> Result<Option<(PeerLink<TcpStream>, SocketAddr)>, NetworkError> {
        match time::timeout(timeout, self.listener.accept()).await {
            Err(_elapsed) => Ok(None),
            Ok(Ok((stream, peer))) => {
                info!("reporter connected from {peer}");
                Ok(Some((PeerLink::new(stream), peer)))
            }
            Ok(Err(e)) => Err(NetworkError::Io(e)),
        }
    }
}

// ── Peer link ─────────────────────────────────────────────────────────────────

/// Outcome of one bounded receive.
#[derive(Debug, PartialEq, Eq)]
pub enum Receipt<'a> {
    /// Bytes arrived; they are only valid until the next receive.
    Data(&'a [u8]),
    /// Nothing arrived within the timeout.
    TimedOut,
    /// The reporter closed its end (zero-length read).
    PeerClosed,
}

/// The monitor's end of a session.
#[derive(Debug)]
pub struct PeerLink<R> {
    reader: R,
    buffer: Box<[u8]>,
    attempts: u64,
    bytes_received: u64,
}

impl<R: AsyncRead + Unpin> PeerLink<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: vec![0; RECEIVE_BUFFER_SIZE].into_boxed_slice(),
            attempts: 0,
            bytes_received: 0,
        }
    }

    /// Reads at most [`RECEIVE_BUFFER_SIZE`] bytes, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Io`] if the read fails.
    pub async fn receive_within(&mut self, timeout: Duration) -> Result<Receipt<'_>, NetworkError> {
        self.attempts += 1;
        match time::timeout(timeout, self.reader.read(&mut self.buffer)).await {
            Err(_elapsed) => Ok(Receipt::TimedOut),
            Ok(Ok(0)) => {
                debug!("peer closed the connection");
                Ok(Receipt::PeerClosed)
            }
            Ok(Ok(n)) => {
                self.bytes_received += n as u64;
                Ok(Receipt::Data(&self.buffer[..n]))
            }
            Ok(Err(e)) => Err(NetworkError::Io(e)),
        }
    }

    /// Number of receive attempts so far, including timeouts.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Total bytes received so far.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
