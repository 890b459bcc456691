//! Regional band plans.
//!
//! A [`BandPlan`] captures everything about the radio environment that the
//! session needs before it can join: serial defaults, the sync word, the
//! second receive window, which block of channels the gateway listens on,
//! and the application port used for uplinks. Plans are built by factory
//! functions; [`us915_lora_mote()`] is the one the LoRaMOTE ships for.
//!
//! | Plan            | Baud  | Sync | RX2                 | Sub-band | Port |
//! |-----------------|-------|------|---------------------|----------|------|
//! | US915 LoRaMOTE  | 57600 | 0x34 | DR8 @ 923.3 MHz     | 49-51    | 1    |

use std::time::Duration;

use loramote_core::types::{Rx2Params, SyncWord};

use crate::channels::SubBand;

/// Static radio and link parameters for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandPlan {
    /// Human-readable plan name.
    pub name: &'static str,
    /// Module UART speed out of reset.
    pub default_baud_rate: u32,
    /// Bound on every response wait, including the delivery line that
    /// follows an uplink.
    pub read_timeout: Duration,
    pub sync_word: SyncWord,
    pub rx2: Rx2Params,
    /// The only block of channels left enabled before joining.
    pub sub_band: SubBand,
    /// LoRaWAN application port for uplinks.
    pub tx_port: u8,
}

/// US915 as configured for a Microchip LoRaMOTE talking to a public
/// network gateway on channels 49-51.
pub fn us915_lora_mote() -> BandPlan {
    BandPlan {
        name: "US915 LoRaMOTE",
        default_baud_rate: 57_600,
        read_timeout: Duration::from_secs(8),
        sync_word: SyncWord::PUBLIC,
        rx2: Rx2Params {
            data_rate: 8,
            freq_hz: 923_300_000,
        },
        sub_band: SubBand::from_bounds(49, 51),
        tx_port: 1,
    }
}
