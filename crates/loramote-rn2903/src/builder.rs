//! MoteBuilder -- fluent builder for constructing [`MoteSession`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! serial parameters, credentials, and response policies before the port
//! is opened. Every radio parameter defaults to the [`BandPlan`].
//!
//! # Example
//!
//! ```no_run
//! use loramote_rn2903::builder::MoteBuilder;
//! use loramote_rn2903::plan::us915_lora_mote;
//! use loramote_core::types::AbpCredentials;
//!
//! # async fn example() -> loramote_core::Result<()> {
//! let credentials = AbpCredentials {
//!     dev_addr: "AABBCCDD".parse()?,
//!     app_session_key: "2B7E151628AED2A6ABF7158809CF4F3C".parse()?,
//!     network_session_key: "2B7E151628AED2A6ABF7158809CF4F3C".parse()?,
//! };
//! let mut session = MoteBuilder::new(us915_lora_mote())
//!     .serial_port("/dev/ttyACM0")
//!     .abp_credentials(credentials)
//!     .build()
//!     .await?;
//! session.join_abp().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use loramote_core::error::{Error, Result};
use loramote_core::transport::Transport;
use loramote_core::types::{AbpCredentials, Rx2Params, SyncWord};
use loramote_line_io::ResponseCheck;
use loramote_transport::SerialConfig;

use crate::channels::SubBand;
use crate::plan::BandPlan;
use crate::session::{MoteSession, SessionParams};

/// Highest LoRaWAN application port.
const MAX_TX_PORT: u8 = 223;

/// Fluent builder for [`MoteSession`].
///
/// ```ignore
/// let session = MoteBuilder::new(us915_lora_mote())
///     .serial_port("/dev/ttyACM0")
///     .build()
///     .await?;
/// ```
pub struct MoteBuilder {
    plan: BandPlan,
    serial_port: Option<String>,
    baud_rate: Option<u32>,
    read_timeout: Duration,
    write_timeout: Option<Duration>,
    credentials: Option<AbpCredentials>,
    sub_band: SubBand,
    sync_word: SyncWord,
    rx2: Rx2Params,
    tx_port: u8,
    response_check: ResponseCheck,
    check_tx_ack: bool,
}

impl MoteBuilder {
    /// Create a new builder with every default taken from `plan`.
    pub fn new(plan: BandPlan) -> Self {
        MoteBuilder {
            serial_port: None,
            baud_rate: None,
            read_timeout: plan.read_timeout,
            write_timeout: SerialConfig::default().write_timeout,
            credentials: None,
            sub_band: plan.sub_band,
            sync_word: plan.sync_word,
            rx2: plan.rx2,
            tx_port: plan.tx_port,
            response_check: ResponseCheck::Unchecked,
            check_tx_ack: false,
            plan,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyACM0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the plan's baud rate.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = Some(baud);
        self
    }

    /// Bound on every response wait (default: the plan's, 8 s for US915).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Bound on handing a write to the port. `Some(Duration::ZERO)` (the
    /// default) never waits; `None` waits for every write to finish.
    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Credentials for [`MoteSession::join_abp`]. Not needed for CW-only
    /// sessions.
    pub fn abp_credentials(mut self, credentials: AbpCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// The channel block left enabled before joining.
    pub fn sub_band(mut self, sub_band: SubBand) -> Self {
        self.sub_band = sub_band;
        self
    }

    pub fn sync_word(mut self, word: SyncWord) -> Self {
        self.sync_word = word;
        self
    }

    pub fn rx2(mut self, rx2: Rx2Params) -> Self {
        self.rx2 = rx2;
        self
    }

    /// LoRaWAN application port for uplinks (1-223).
    pub fn tx_port(mut self, port: u8) -> Self {
        self.tx_port = port;
        self
    }

    /// How configuration and carrier answers are validated:
    /// [`Unchecked`](ResponseCheck::Unchecked) (default) reads and ignores
    /// them, [`ResponseCheck::OK`] fails on anything but `ok`.
    pub fn response_check(mut self, check: ResponseCheck) -> Self {
        self.response_check = check;
        self
    }

    /// Require `ok` as the local acknowledgment of an uplink before waiting
    /// for its delivery status (default: off).
    pub fn check_tx_ack(mut self, enabled: bool) -> Self {
        self.check_tx_ack = enabled;
        self
    }

    /// Build a [`MoteSession`] with a caller-provided transport.
    ///
    /// This is the primary entry point for testing (pass a
    /// `MockTransport` from `loramote-test-harness`).
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<MoteSession> {
        if self.tx_port == 0 || self.tx_port > MAX_TX_PORT {
            return Err(Error::InvalidParameter(format!(
                "tx_port must be 1-{MAX_TX_PORT}, got {}",
                self.tx_port
            )));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "read_timeout must be non-zero".into(),
            ));
        }

        let tx_ack_check = if self.check_tx_ack {
            ResponseCheck::OK
        } else {
            ResponseCheck::Unchecked
        };

        Ok(MoteSession::new(
            transport,
            self.read_timeout,
            SessionParams {
                credentials: self.credentials,
                sync_word: self.sync_word,
                rx2: self.rx2,
                sub_band: self.sub_band,
                tx_port: self.tx_port,
                response_check: self.response_check,
                tx_ack_check,
            },
        ))
    }

    /// Build a [`MoteSession`] over a serial port.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    /// The baud rate defaults to the plan's if not overridden.
    pub async fn build(self) -> Result<MoteSession> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;
        let config = SerialConfig {
            baud_rate: self.baud_rate.unwrap_or(self.plan.default_baud_rate),
            write_timeout: self.write_timeout,
            ..SerialConfig::default()
        };

        let transport = loramote_transport::SerialTransport::open_with_config(port, config).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::us915_lora_mote;
    use loramote_core::types::SessionState;
    use loramote_test_harness::MockTransport;

    #[tokio::test]
    async fn builder_defaults() {
        let session = MoteBuilder::new(us915_lora_mote())
            .build_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Unconfigured);
        assert_eq!(session.read_timeout(), Duration::from_secs(8));
        assert!(session.dev_addr().is_none());
    }

    #[tokio::test]
    async fn builder_fluent_chain() {
        let session = MoteBuilder::new(us915_lora_mote())
            .serial_port("/dev/ttyACM0")
            .baud_rate(115_200)
            .read_timeout(Duration::from_secs(2))
            .write_timeout(None)
            .sub_band(SubBand::new(8, 15).unwrap())
            .sync_word(SyncWord(0x12))
            .rx2(Rx2Params {
                data_rate: 10,
                freq_hz: 923_900_000,
            })
            .tx_port(10)
            .response_check(ResponseCheck::OK)
            .check_tx_ack(true)
            .build_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();

        assert_eq!(session.read_timeout(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn builder_rejects_bad_tx_port() {
        for port in [0u8, 224] {
            let result = MoteBuilder::new(us915_lora_mote())
                .tx_port(port)
                .build_with_transport(Box::new(MockTransport::new()))
                .await;
            assert!(matches!(result, Err(Error::InvalidParameter(_))), "port {port}");
        }
    }

    #[tokio::test]
    async fn builder_rejects_zero_read_timeout() {
        let result = MoteBuilder::new(us915_lora_mote())
            .read_timeout(Duration::ZERO)
            .build_with_transport(Box::new(MockTransport::new()))
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn builder_serial_port_required_for_build() {
        let result = MoteBuilder::new(us915_lora_mote()).build().await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }
}
