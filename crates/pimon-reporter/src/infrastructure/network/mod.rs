//! Network infrastructure for the reporter.
//!
//! A [`ReporterLink`] owns the one TCP connection of a reporter session and
//! writes one encoded frame per reading.  It is generic over the writer so
//! tests can capture frames in memory instead of opening a socket.
//!
//! Dropping the link releases the socket on every exit path; [`close`]
//! additionally performs an orderly write shutdown so the monitor observes a
//! clean end of stream.
//!
//! [`close`]: ReporterLink::close

use pimon_core::{encode_frame, FrameError, Reading};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Errors that can occur on the reporter's connection.
#[derive(Debug, Error)]
pub enum LinkError {
    /// TCP connection to the monitor failed.
    #[error("failed to connect to monitor at {endpoint}: {source}")]
    ConnectFailed {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The reading could not be encoded.
    #[error("frame encoding failed: {0}")]
    Encode(#[from] FrameError),
}

/// The reporter's end of a session.
#[derive(Debug)]
pub struct ReporterLink<W> {
    writer: W,
    frames_sent: u64,
}

impl ReporterLink<TcpStream> {
    /// Connects to the monitor at `host:port`.
    ///
    /// There is no connect timeout: this waits as long as the operating
    /// system does.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::ConnectFailed`] if the connection cannot be made.
    pub async fn connect(host: &str, port: u16) -> Result<Self, LinkError> {
        let endpoint = format!("{host}:{port}");
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| LinkError::ConnectFailed {
                endpoint: endpoint.clone(),
                source,
            })?;
        // Frames are small and periodic; send each one immediately.
        stream.set_nodelay(true)?;
        info!("connected to monitor at {endpoint}");
        Ok(Self::new(stream))
    }
}

impl<W: AsyncWrite + Unpin> ReporterLink<W> {
    /// Wraps an already-connected writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames_sent: 0,
        }
    }

    /// Encodes `reading` as one frame and writes all of it.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Encode`] if encoding fails (nothing is written)
    /// or [`LinkError::Io`] if the write fails.
    pub async fn send(&mut self, reading: &Reading) -> Result<(), LinkError> {
        let frame = encode_frame(reading)?;
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        self.frames_sent += 1;
        debug!(
            iteration = reading.iteration(),
            bytes = frame.len(),
            "frame sent"
        );
        Ok(())
    }

    /// Shuts down the write side so the peer reads end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Io`] if the shutdown fails.
    pub async fn close(&mut self) -> Result<(), LinkError> {
        self.writer.shutdown().await?;
        Ok(())
    }

    /// Number of frames written so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
