//! Line-oriented command channel for loramote.
//!
//! The RN2903 speaks a plain ASCII protocol: every command is one line
//! terminated by CRLF, and every answer is one line as well. Some commands
//! answer twice (a local acknowledgment, then a second line once the radio
//! exchange finishes).
//!
//! # Architecture
//!
//! - [`protocol`] -- encode command lines and split received bytes into lines
//! - [`io`] -- [`CommandChannel`], the send-a-line/get-a-line primitive over
//!   a [`Transport`](loramote_core::Transport)

pub mod io;
pub mod protocol;

pub use io::{CommandChannel, ResponseCheck};
