//! loramote-rn2903: Microchip RN2903 LoRaWAN module driver.
//!
//! Drives an RN2903 (as found on the LoRaMOTE) over its ASCII command
//! interface to do one of two things:
//!
//! - provision an ABP session on US915, join, and send unconfirmed
//!   uplinks, reporting whether each was delivered;
//! - key the raw carrier in a repeating on/off pattern for RF testing.
//!
//! # Modules
//!
//! - [`commands`] -- pure command-line builders and response tokens
//! - [`plan`] -- regional defaults ([`us915_lora_mote()`](plan::us915_lora_mote))
//! - [`channels`] -- sub-band selection and the 72-slot channel mask
//! - [`cw`] -- the carrier test pattern
//! - [`builder`] -- [`MoteBuilder`]
//! - [`session`] -- [`MoteSession`], the setup state machine and the
//!   join/uplink/CW operations

pub mod builder;
pub mod channels;
pub mod commands;
pub mod cw;
pub mod plan;
pub mod session;

pub use builder::MoteBuilder;
pub use loramote_line_io::ResponseCheck;
pub use channels::{ChannelMask, SubBand};
pub use plan::{us915_lora_mote, BandPlan};
pub use session::MoteSession;
