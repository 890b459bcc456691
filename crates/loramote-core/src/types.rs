//! Core types used throughout loramote.
//!
//! The hex-valued command arguments ([`DevAddr`], [`SessionKey`],
//! [`HexPayload`]) are validated once at construction and afterwards
//! rendered exactly as the caller wrote them: no case folding and no
//! re-encoding, because the module treats them as literal tokens.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Error returned when a string is not a valid hex argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseHexError {
    what: &'static str,
    value: String,
    reason: &'static str,
}

impl fmt::Display for ParseHexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}' ({})", self.what, self.value, self.reason)
    }
}

impl std::error::Error for ParseHexError {}

impl From<ParseHexError> for Error {
    fn from(e: ParseHexError) -> Self {
        Error::InvalidParameter(e.to_string())
    }
}

fn check_hex(what: &'static str, s: &str) -> std::result::Result<(), ParseHexError> {
    let fail = |reason| ParseHexError {
        what,
        value: s.to_string(),
        reason,
    };
    if s.is_empty() {
        return Err(fail("empty"));
    }
    if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(fail("non-hex character"));
    }
    Ok(())
}

/// LoRaWAN device address, as sent with `mac set devaddr`.
///
/// Up to 8 hex digits (a 32-bit address). Kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DevAddr(String);

impl DevAddr {
    /// Maximum number of hex digits in a device address.
    pub const MAX_DIGITS: usize = 8;

    /// The address exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DevAddr {
    type Err = ParseHexError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        check_hex("device address", s)?;
        if s.len() > Self::MAX_DIGITS {
            return Err(ParseHexError {
                what: "device address",
                value: s.to_string(),
                reason: "longer than 8 hex digits",
            });
        }
        Ok(DevAddr(s.to_string()))
    }
}

impl fmt::Display for DevAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 128-bit LoRaWAN session key (network or application) as 32 hex digits.
///
/// `Debug` does not print the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(String);

impl SessionKey {
    /// Number of hex digits in a session key.
    pub const DIGITS: usize = 32;

    /// The key exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionKey {
    type Err = ParseHexError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        check_hex("session key", s)?;
        if s.len() != Self::DIGITS {
            return Err(ParseHexError {
                what: "session key",
                value: s.to_string(),
                reason: "must be exactly 32 hex digits",
            });
        }
        Ok(SessionKey(s.to_string()))
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// An uplink payload, hex-encoded, as passed to `mac tx`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HexPayload(String);

impl HexPayload {
    /// The payload exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of payload bytes the hex string encodes.
    pub fn byte_len(&self) -> usize {
        self.0.len() / 2
    }
}

impl FromStr for HexPayload {
    type Err = ParseHexError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        check_hex("payload", s)?;
        if s.len() % 2 != 0 {
            return Err(ParseHexError {
                what: "payload",
                value: s.to_string(),
                reason: "odd number of hex digits",
            });
        }
        Ok(HexPayload(s.to_string()))
    }
}

impl fmt::Display for HexPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// LoRa synchronization word (`mac set sync`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncWord(pub u8);

impl SyncWord {
    /// The public LoRaWAN network sync word.
    pub const PUBLIC: SyncWord = SyncWord(0x34);
}

impl fmt::Display for SyncWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

/// Parameters of the second receive window (`mac set rx2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rx2Params {
    /// Data rate index.
    pub data_rate: u8,
    /// Frequency in hertz.
    pub freq_hz: u32,
}

/// ABP session credentials provisioned into the module before joining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbpCredentials {
    pub dev_addr: DevAddr,
    pub app_session_key: SessionKey,
    pub network_session_key: SessionKey,
}

/// Where a session is in its setup sequence.
///
/// The ABP path runs `Unconfigured → ResetIssued → CredentialsSet →
/// ChannelsConfigured → JoinRequested` and ends in one of `Joined`,
/// `JoinRejected` or `JoinTimedOut`. The CW path runs `Unconfigured →
/// ResetIssued → ModulationSet → CwReady`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Unconfigured,
    ResetIssued,
    CredentialsSet,
    ChannelsConfigured,
    JoinRequested,
    Joined,
    JoinRejected,
    JoinTimedOut,
    ModulationSet,
    CwReady,
}

impl SessionState {
    /// Whether uplinks may be sent in this state.
    pub fn can_transmit(&self) -> bool {
        matches!(self, SessionState::Joined)
    }

    /// Whether raw carrier control commands are accepted in this state.
    pub fn can_key_carrier(&self) -> bool {
        matches!(self, SessionState::CwReady)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Unconfigured => "unconfigured",
            SessionState::ResetIssued => "reset issued",
            SessionState::CredentialsSet => "credentials set",
            SessionState::ChannelsConfigured => "channels configured",
            SessionState::JoinRequested => "join requested",
            SessionState::Joined => "joined",
            SessionState::JoinRejected => "join rejected",
            SessionState::JoinTimedOut => "join timed out",
            SessionState::ModulationSet => "modulation set",
            SessionState::CwReady => "CW ready",
        };
        f.write_str(s)
    }
}

/// Result of an ABP join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The module answered `accepted`.
    Accepted,
    /// The module answered with something else, kept verbatim.
    Rejected { response: String },
    /// No outcome line arrived within the read timeout.
    TimedOut,
}

impl JoinOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, JoinOutcome::Accepted)
    }
}

/// Result of an unconfirmed uplink.
///
/// Every variant carries the synchronous acknowledgment line so callers
/// can see what the module said about the local transmit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransmitOutcome {
    /// The asynchronous line was `mac_tx_ok`.
    Delivered { ack: String },
    /// The synchronous acknowledgment was checked and was not `ok`; no
    /// asynchronous line was awaited.
    Rejected { ack: String },
    /// The asynchronous line was something other than `mac_tx_ok`.
    Failed { ack: String, response: String },
    /// No asynchronous line arrived within the read timeout.
    TimedOut { ack: String },
}

impl TransmitOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, TransmitOutcome::Delivered { .. })
    }

    /// The synchronous acknowledgment line.
    pub fn ack(&self) -> &str {
        match self {
            TransmitOutcome::Delivered { ack }
            | TransmitOutcome::Rejected { ack }
            | TransmitOutcome::Failed { ack, .. }
            | TransmitOutcome::TimedOut { ack } => ack,
        }
    }
}

impl fmt::Display for TransmitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransmitOutcome::Delivered { .. } => write!(f, "delivered"),
            TransmitOutcome::Rejected { ack } => write!(f, "rejected by module: '{ack}'"),
            TransmitOutcome::Failed { response, .. } => write!(f, "failed: '{response}'"),
            TransmitOutcome::TimedOut { .. } => write!(f, "timed out waiting for delivery status"),
        }
    }
}
