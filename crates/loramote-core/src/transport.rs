//! Transport trait for module communication.
//!
//! The [`Transport`] trait abstracts over the physical link to the radio
//! module. The production implementation is the serial port in
//! `loramote-transport`; tests use `MockTransport` from
//! `loramote-test-harness`.
//!
//! Line framing is not a transport concern: the command channel in
//! `loramote-line-io` assembles lines out of whatever chunks `receive`
//! hands back.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a radio module.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the module.
    ///
    /// May return [`Error::Timeout`](crate::error::Error::Timeout) when the
    /// transport is configured with a write timeout and the bytes could not
    /// be handed off in time.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the module into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if no data is received within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
