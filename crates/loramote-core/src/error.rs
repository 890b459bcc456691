//! Error types for loramote.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport failures, protocol
//! mismatches, and caller mistakes are all captured here.
//!
//! Note that a rejected join or an undelivered uplink is *not* an error:
//! those are reported as [`JoinOutcome`](crate::types::JoinOutcome) and
//! [`TransmitOutcome`](crate::types::TransmitOutcome) values so the caller
//! can decide what to do next.

/// The error type for all loramote operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error, such as a serial port that cannot be opened.
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (malformed traffic, unexpected exchange).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A checked command received something other than its success token.
    #[error("unexpected response to '{command}': expected '{expected}', got '{received}'")]
    UnexpectedResponse {
        /// The command line that was sent (without terminator).
        command: String,
        /// The literal the module should have answered with.
        expected: &'static str,
        /// The literal the module actually answered with.
        received: String,
    },

    /// Timed out waiting for a response line from the module.
    ///
    /// This is distinct from the module sending an empty line, which is
    /// delivered as an empty response.
    #[error("timeout waiting for response")]
    Timeout,

    /// An uplink was requested on a session that has not joined.
    #[error("session has not joined the network")]
    NotJoined,

    /// The session is not in the state the operation requires.
    #[error("invalid session state: {0}")]
    InvalidState(String),

    /// An invalid parameter was passed to a command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the module has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the module was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the module's answer did not match what the
    /// protocol requires, as opposed to a transport or caller failure.
    ///
    /// Transmitting on a session that never joined falls in this class too.
    pub fn is_protocol_mismatch(&self) -> bool {
        matches!(
            self,
            Error::Protocol(_) | Error::UnexpectedResponse { .. } | Error::NotJoined
        )
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
