//! Transport implementations for loramote.
//!
//! This crate provides the serial implementation of the
//! [`Transport`](loramote_core::Transport) trait from `loramote-core`:
//!
//! - [`SerialTransport`]: USB virtual COM port of the LoRaMOTE (or any
//!   RN2903 wired to a UART)
//!
//! # Example
//!
//! ```no_run
//! use loramote_transport::SerialTransport;
//! use loramote_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> loramote_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyACM0", 57_600).await?;
//!
//! transport.send(b"sys get ver\r\n").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(8)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{SerialConfig, SerialTransport, DEFAULT_BAUD_RATE};
