//! The command channel: one command line out, one response line back.
//!
//! [`CommandChannel`] owns the transport exclusively. Every call is a
//! strictly sequential exchange; there is no background reader and no
//! request queue, so the caller must never have two exchanges in flight
//! (the `&mut self` receivers enforce this).
//!
//! A single read timeout, fixed when the channel is created, bounds every
//! wait for a line, including the second line of two-line answers.

use std::time::Duration;

use bytes::BytesMut;
use tokio::time::Instant;
use tracing::{debug, warn};

use loramote_core::error::{Error, Result};
use loramote_core::transport::Transport;

use crate::protocol::{self, DecodeResult};

/// How a command's response line is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCheck {
    /// The line is read to keep the channel in sync, then ignored.
    Unchecked,
    /// The line must equal this literal exactly.
    Expect(&'static str),
}

impl ResponseCheck {
    /// The module's generic success token.
    pub const OK: ResponseCheck = ResponseCheck::Expect("ok");

    /// Check `response` to `command` against this policy.
    pub fn verify(&self, command: &str, response: &str) -> Result<()> {
        match *self {
            ResponseCheck::Unchecked => Ok(()),
            ResponseCheck::Expect(expected) if response == expected => Ok(()),
            ResponseCheck::Expect(expected) => Err(Error::UnexpectedResponse {
                command: command.to_string(),
                expected,
                received: response.to_string(),
            }),
        }
    }
}

/// Maximum bytes buffered without seeing a line end.
/// RN2903 lines are well under 100 bytes; 8192 is generous headroom.
const MAX_BUF: usize = 8192;

/// Line-oriented request/response channel over a [`Transport`].
pub struct CommandChannel {
    transport: Box<dyn Transport>,
    read_timeout: Duration,
    /// Received bytes not yet returned as a line.
    rx_buf: BytesMut,
}

impl CommandChannel {
    /// Wrap `transport`; every line read waits at most `read_timeout`.
    pub fn new(transport: Box<dyn Transport>, read_timeout: Duration) -> Self {
        CommandChannel {
            transport,
            read_timeout,
            rx_buf: BytesMut::with_capacity(256),
        }
    }

    /// The bound applied to every line read.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Write one command line without waiting for an answer.
    ///
    /// Writes are fire-and-forget: a write that times out is logged and
    /// treated as sent. Any other transport failure is returned.
    pub async fn write(&mut self, command: &str) -> Result<()> {
        let bytes = protocol::encode_command(command)?;
        debug!(command, "sending command");
        match self.transport.send(&bytes).await {
            Ok(()) => Ok(()),
            Err(Error::Timeout) => {
                warn!(command, "write timed out, continuing");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Send `command` and return the next response line.
    ///
    /// Returns [`Error::Timeout`] if no complete line arrives within the
    /// read timeout. A blank line from the module is returned as `""`.
    pub async fn send(&mut self, command: &str) -> Result<String> {
        self.write(command).await?;
        self.read_next().await
    }

    /// Send `command` and validate its response line with `check`.
    ///
    /// The line is always consumed, even when it is not checked, so the
    /// next exchange starts in sync.
    pub async fn transact(&mut self, command: &str, check: ResponseCheck) -> Result<String> {
        let response = self.send(command).await?;
        check.verify(command, &response)?;
        Ok(response)
    }

    /// Wait for the next line without sending anything first.
    ///
    /// Used to collect the second answer of commands such as `mac tx` and
    /// `mac join`.
    pub async fn read_next(&mut self) -> Result<String> {
        let deadline = Instant::now() + self.read_timeout;
        let mut recv_buf = [0u8; 256];

        loop {
            if let DecodeResult::Line { text, consumed } = protocol::decode_line(&self.rx_buf) {
                let _ = self.rx_buf.split_to(consumed);
                debug!(response = %text, "received line");
                return Ok(text);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out());
            }

            match self.transport.receive(&mut recv_buf, deadline - now).await {
                Ok(n) => {
                    self.rx_buf.extend_from_slice(&recv_buf[..n]);
                    self.shed_overflow();
                }
                Err(Error::Timeout) => return Err(self.timed_out()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Keep the buffer bounded without losing lines that follow an
    /// over-long one. Whole lines are only ever dropped when they alone
    /// exceed the limit; with no line end at all the buffer is noise.
    fn shed_overflow(&mut self) {
        if self.rx_buf.len() <= MAX_BUF {
            return;
        }
        match self.rx_buf.iter().position(|&b| b == protocol::LINE_END) {
            Some(end) if end >= MAX_BUF => {
                warn!(len = end + 1, "discarding over-long line");
                let _ = self.rx_buf.split_to(end + 1);
            }
            Some(_) => {}
            None => {
                warn!(len = self.rx_buf.len(), "line buffer overflow, clearing");
                self.rx_buf.clear();
            }
        }
    }

    fn timed_out(&self) -> Error {
        if self.rx_buf.is_empty() {
            debug!(timeout_ms = self.read_timeout.as_millis(), "no response line");
        } else {
            debug!(
                timeout_ms = self.read_timeout.as_millis(),
                partial = %String::from_utf8_lossy(&self.rx_buf),
                "no line end before timeout, keeping partial line"
            );
        }
        Error::Timeout
    }

    /// Close the underlying transport.
    pub async fn close(&mut self) -> Result<()> {
        self.rx_buf.clear();
        self.transport.close().await
    }

    /// Whether the underlying transport is still connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Give the transport back, discarding any buffered partial line.
    pub fn into_transport(self) -> Box<dyn Transport> {
        self.transport
    }
}
