//! loramote-core: Core traits, types, and error definitions for loramote.
//!
//! This crate defines the pieces shared by every layer of the LoRaMOTE
//! driver stack: the byte-level [`Transport`] abstraction, the validated
//! value types that end up on the wire (device address, session keys,
//! payloads), the outcomes reported by join and transmit operations, and
//! the common [`Error`] type.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`DevAddr`], [`SessionKey`], [`HexPayload`] -- validated hex arguments
//! - [`JoinOutcome`] / [`TransmitOutcome`] -- results of the gated operations
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use loramote_core::*`.
pub use error::{Error, Result};
pub use transport::Transport;
pub use types::*;
