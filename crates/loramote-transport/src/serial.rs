//! Serial link to an RN2903.
//!
//! [`SerialTransport`] implements [`Transport`] over the LoRaMOTE's USB
//! virtual COM port (or any UART the module is wired to). The module's
//! framing is not negotiable: 8 data bits, no parity, 1 stop bit, and no
//! hardware or software handshaking. Only the speed and how long a write
//! may block are configurable.
//!
//! # Example
//!
//! ```no_run
//! use loramote_transport::SerialTransport;
//! use loramote_core::transport::Transport;
//!
//! # async fn example() -> loramote_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyACM0", 57_600).await?;
//! transport.send(b"sys reset\r\n").await?;
//! # Ok(())
//! # }
//! ```

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{
    DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream, StopBits,
};
use tracing::{debug, error, info, trace, warn};

use loramote_core::error::{Error, Result};
use loramote_core::transport::Transport;

/// The RN2903 UART speed out of reset.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Tunable parts of the serial link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    /// Upper bound on handing a write to the port.
    ///
    /// `Some(Duration::ZERO)` makes writes non-blocking: the write is polled
    /// once and [`Error::Timeout`] is returned if it could not complete
    /// immediately. `None` waits for the write to finish.
    pub write_timeout: Option<Duration>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baud_rate: DEFAULT_BAUD_RATE,
            write_timeout: Some(Duration::ZERO),
        }
    }
}

/// Open `path` with the module's fixed 8N1, no-handshake framing.
fn open_port(path: &str, baud_rate: u32) -> Result<SerialStream> {
    let mut stream = tokio_serial::new(path, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|e| {
            error!(port = %path, error = %e, "cannot open serial port");
            Error::Transport(format!("cannot open serial port {path}: {e}"))
        })?;

    // The module ignores the modem lines; keep them low.
    if let Err(e) = stream.write_data_terminal_ready(false) {
        warn!(port = %path, error = %e, "could not clear DTR");
    }
    if let Err(e) = stream.write_request_to_send(false) {
        warn!(port = %path, error = %e, "could not clear RTS");
    }
    Ok(stream)
}

fn link_error(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::NotConnected => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}

/// An open serial connection to one module.
pub struct SerialTransport {
    stream: Option<SerialStream>,
    path: String,
    write_timeout: Option<Duration>,
}

impl SerialTransport {
    /// Open `path` at `baud_rate` with a non-blocking write.
    pub async fn open(path: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_config(
            path,
            SerialConfig {
                baud_rate,
                ..SerialConfig::default()
            },
        )
        .await
    }

    pub async fn open_with_config(path: &str, config: SerialConfig) -> Result<Self> {
        debug!(
            port = %path,
            baud_rate = config.baud_rate,
            write_timeout = ?config.write_timeout,
            "opening serial port (8N1, no flow control)"
        );
        let stream = open_port(path, config.baud_rate)?;
        info!(port = %path, baud_rate = config.baud_rate, "serial port open");

        Ok(SerialTransport {
            stream: Some(stream),
            path: path.to_string(),
            write_timeout: config.write_timeout,
        })
    }

    /// The path the port was opened with.
    pub fn port_name(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        trace!(port = %self.path, data = ?String::from_utf8_lossy(data), "tx");

        let write = async {
            stream.write_all(data).await?;
            stream.flush().await
        };
        let written = match self.write_timeout {
            None => write.await,
            Some(limit) => tokio::time::timeout(limit, write)
                .await
                .map_err(|_| Error::Timeout)?,
        };

        written.map_err(|e| {
            error!(port = %self.path, error = %e, "write failed");
            link_error(e)
        })
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let n = tokio::time::timeout(timeout, stream.read(buf))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| {
                error!(port = %self.path, error = %e, "read failed");
                link_error(e)
            })?;

        if n == 0 {
            error!(port = %self.path, "serial port closed by the device");
            return Err(Error::ConnectionLost);
        }
        trace!(port = %self.path, data = ?String::from_utf8_lossy(&buf[..n]), "rx");
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.flush().await {
                warn!(port = %self.path, error = %e, "flush before close failed");
            }
            info!(port = %self.path, "serial port closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.stream.is_some() {
            debug!(port = %self.path, "serial port dropped while open");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_non_blocking_at_module_speed() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 57_600);
        assert_eq!(config.write_timeout, Some(Duration::ZERO));
    }

    #[test]
    fn broken_link_maps_to_connection_lost() {
        let e = link_error(std::io::Error::new(ErrorKind::BrokenPipe, "gone"));
        assert!(matches!(e, Error::ConnectionLost));
        let e = link_error(std::io::Error::new(ErrorKind::NotConnected, "unplugged"));
        assert!(matches!(e, Error::ConnectionLost));
        let e = link_error(std::io::Error::new(ErrorKind::Other, "odd"));
        assert!(matches!(e, Error::Io(_)));
    }

    #[tokio::test]
    async fn open_missing_port_is_transport_error() {
        let result = SerialTransport::open("/dev/loramote-does-not-exist", 57_600).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
