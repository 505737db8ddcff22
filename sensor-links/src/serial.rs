//! UART plumbing shared by the CO2 and dust links.
//!
//! The core never names a concrete serial type. The bridge supplies a
//! [`SerialOpen`] that produces `tokio-serial` ports, tests supply
//! in-memory duplex streams.

use std::future;
use std::io;

use log::{info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Connection state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Closed,
    Open,
    /// A request was written and no valid response has been consumed yet.
    AwaitingResponse,
}

/// Factory for a serial port. Called again every time the link has to re-open.
pub trait SerialOpen {
    type Port: AsyncRead + AsyncWrite + Unpin;

    fn open(&mut self) -> io::Result<Self::Port>;

    /// Human readable name used in log lines, usually the device path.
    fn name(&self) -> &str;
}

/// Owns an opener and the currently open port, if any.
pub struct SerialLink<O: SerialOpen> {
    opener: O,
    port: Option<O::Port>,
}

impl<O: SerialOpen> SerialLink<O> {
    pub fn new(opener: O) -> Self {
        Self { opener, port: None }
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    pub fn name(&self) -> &str {
        self.opener.name()
    }

    /// Opens the port unless it already is. Failures are logged and reported
    /// as `false`; the caller retries on its next tick.
    pub fn ensure_open(&mut self) -> bool {
        if self.port.is_some() {
            return true;
        }

        match self.opener.open() {
            Ok(port) => {
                info!("Opened serial port {}", self.opener.name());
                self.port = Some(port);
                true
            }
            Err(e) => {
                warn!("Failed to open serial port {}: {}", self.opener.name(), e);
                false
            }
        }
    }

    pub async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "port is closed"))?;

        let result = match port.write_all(bytes).await {
            Ok(()) => port.flush().await,
            Err(e) => Err(e),
        };
        if let Err(ref e) = result {
            warn!("Write to {} failed: {}", self.opener.name(), e);
            self.close();
        }
        result
    }

    /// Reads whatever is available. Never completes while the port is closed,
    /// so it can sit in a `select!` branch unconditionally.
    pub async fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        match self.port.as_mut() {
            Some(port) => port.read(buffer).await,
            None => future::pending().await,
        }
    }

    /// Interprets the outcome of [`SerialLink::read`]. Returns the number of
    /// fresh bytes, closing the port on EOF or error.
    pub fn settle_read(&mut self, result: io::Result<usize>) -> usize {
        match result {
            Ok(0) => {
                warn!("Serial port {} reached end of stream", self.opener.name());
                self.close();
                0
            }
            Ok(read) => read,
            Err(e) => {
                warn!("Read from {} failed: {}", self.opener.name(), e);
                self.close();
                0
            }
        }
    }

    pub fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Closed serial port {}", self.opener.name());
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::DuplexOpener;
    use super::*;

    #[tokio::test]
    async fn open_failure_is_retryable() {
        let mut link = SerialLink::new(DuplexOpener::unavailable());
        assert!(!link.ensure_open());
        assert!(!link.is_open());

        link.opener.ports.push_back(tokio::io::duplex(64).0);
        assert!(link.ensure_open());
        assert!(link.ensure_open());
        assert_eq!(link.opener.attempts.get(), 2);
    }

    #[tokio::test]
    async fn eof_closes_the_port() {
        let (port, remote) = tokio::io::duplex(64);
        let mut link = SerialLink::new(DuplexOpener::with_ports([port]));
        assert!(link.ensure_open());

        drop(remote);
        let mut buffer = [0u8; 16];
        let result = link.read(&mut buffer).await;
        assert_eq!(link.settle_read(result), 0);
        assert!(!link.is_open());
    }

    #[tokio::test]
    async fn write_on_closed_port_is_rejected() {
        let mut link = SerialLink::new(DuplexOpener::unavailable());
        let err = link.write_all(&[0x01]).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }
}
