//! loramote-test-harness: Test utilities and mock transports for loramote.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the command channel and session controller without a LoRaMOTE attached,
//! and [`MockHandle`] for inspecting the traffic after the transport has
//! been handed to the code under test.

pub mod mock_serial;

pub use mock_serial::{MockHandle, MockTransport, SentRecord};
