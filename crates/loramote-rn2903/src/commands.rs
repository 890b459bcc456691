//! RN2903 command builders and response tokens.
//!
//! All functions are pure -- they produce command lines without performing
//! any I/O and without the CRLF terminator, which the command channel adds.
//! Hex arguments are rendered exactly as the caller supplied them.
//!
//! # RN2903 command reference
//!
//! Based on the RN2903 LoRa Technology Module Command Reference User's
//! Guide. Commands are grouped by subsystem prefix: `sys` (module),
//! `mac` (LoRaWAN stack), and `radio` (raw transceiver access, only
//! available while the MAC is paused).

use loramote_core::types::{DevAddr, HexPayload, Rx2Params, SessionKey, SyncWord};

// ---------------------------------------------------------------
// Response tokens
// ---------------------------------------------------------------

/// Generic success answer to a configuration command.
pub const RESP_OK: &str = "ok";
/// Second answer to `mac join` when the join succeeded.
pub const RESP_ACCEPTED: &str = "accepted";
/// Second answer to `mac tx` when the uplink went out.
pub const RESP_MAC_TX_OK: &str = "mac_tx_ok";

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

// ---------------------------------------------------------------
// sys
// ---------------------------------------------------------------

/// Reset the module (`sys reset`). The module answers with its version
/// banner rather than `ok`.
pub fn cmd_sys_reset() -> String {
    "sys reset".to_string()
}

// ---------------------------------------------------------------
// radio
// ---------------------------------------------------------------

/// Select the LoRa modulation (`radio set mod lora`).
pub fn cmd_radio_set_mod_lora() -> String {
    "radio set mod lora".to_string()
}

/// Key the unmodulated carrier on or off (`radio cw on|off`).
pub fn cmd_radio_cw(on: bool) -> String {
    format!("radio cw {}", on_off(on))
}

// ---------------------------------------------------------------
// mac
// ---------------------------------------------------------------

/// Suspend the LoRaWAN stack so `radio` commands are accepted
/// (`mac pause`). The module answers with the pause length in
/// milliseconds, not `ok`.
pub fn cmd_mac_pause() -> String {
    "mac pause".to_string()
}

/// `mac set devaddr <hex>`.
pub fn cmd_set_devaddr(addr: &DevAddr) -> String {
    format!("mac set devaddr {addr}")
}

/// `mac set appskey <hex32>`.
pub fn cmd_set_appskey(key: &SessionKey) -> String {
    format!("mac set appskey {key}")
}

/// `mac set nwkskey <hex32>`.
pub fn cmd_set_nwkskey(key: &SessionKey) -> String {
    format!("mac set nwkskey {key}")
}

/// Enable or disable adaptive data rate (`mac set adr on|off`).
pub fn cmd_set_adr(on: bool) -> String {
    format!("mac set adr {}", on_off(on))
}

/// `mac set sync <hex>`.
pub fn cmd_set_sync(word: SyncWord) -> String {
    format!("mac set sync {word}")
}

/// `mac set rx2 <dr> <freq>`.
pub fn cmd_set_rx2(rx2: Rx2Params) -> String {
    format!("mac set rx2 {} {}", rx2.data_rate, rx2.freq_hz)
}

/// Enable or disable one channel (`mac set ch status <idx> on|off`).
pub fn cmd_set_channel_status(index: u8, on: bool) -> String {
    format!("mac set ch status {index} {}", on_off(on))
}

/// Join using the provisioned ABP session (`mac join abp`).
pub fn cmd_join_abp() -> String {
    "mac join abp".to_string()
}

/// Unconfirmed uplink on `port` (`mac tx uncnf <port> <hex>`).
pub fn cmd_tx_uncnf(port: u8, payload: &HexPayload) -> String {
    format!("mac tx uncnf {port} {payload}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_commands() {
        assert_eq!(cmd_sys_reset(), "sys reset");
        assert_eq!(cmd_radio_set_mod_lora(), "radio set mod lora");
        assert_eq!(cmd_mac_pause(), "mac pause");
        assert_eq!(cmd_join_abp(), "mac join abp");
        assert_eq!(cmd_set_adr(false), "mac set adr off");
        assert_eq!(cmd_radio_cw(true), "radio cw on");
        assert_eq!(cmd_radio_cw(false), "radio cw off");
    }

    #[test]
    fn credential_commands_keep_hex_verbatim() {
        let addr: DevAddr = "AABBccdd".parse().unwrap();
        assert_eq!(cmd_set_devaddr(&addr), "mac set devaddr AABBccdd");

        let key: SessionKey = "2B7E151628AED2A6ABF7158809CF4F3C".parse().unwrap();
        assert_eq!(
            cmd_set_appskey(&key),
            "mac set appskey 2B7E151628AED2A6ABF7158809CF4F3C"
        );
        assert_eq!(
            cmd_set_nwkskey(&key),
            "mac set nwkskey 2B7E151628AED2A6ABF7158809CF4F3C"
        );
    }

    #[test]
    fn sync_and_rx2() {
        assert_eq!(cmd_set_sync(SyncWord(0x34)), "mac set sync 34");
        assert_eq!(
            cmd_set_rx2(Rx2Params {
                data_rate: 8,
                freq_hz: 923_300_000,
            }),
            "mac set rx2 8 923300000"
        );
    }

    #[test]
    fn channel_status() {
        assert_eq!(cmd_set_channel_status(0, false), "mac set ch status 0 off");
        assert_eq!(cmd_set_channel_status(49, true), "mac set ch status 49 on");
    }

    #[test]
    fn tx_uncnf_payload_verbatim() {
        let payload: HexPayload = "DEADBEEF".parse().unwrap();
        assert_eq!(cmd_tx_uncnf(1, &payload), "mac tx uncnf 1 DEADBEEF");
        let payload: HexPayload = "deadBEEF".parse().unwrap();
        assert_eq!(cmd_tx_uncnf(1, &payload), "mac tx uncnf 1 deadBEEF");
    }
}
