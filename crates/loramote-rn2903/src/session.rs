//! MoteSession -- the RN2903 session controller.
//!
//! A session owns the [`CommandChannel`] to one module and walks it through
//! one of two setup sequences:
//!
//! - **ABP**: reset, provision the session credentials and radio
//!   parameters, push the channel mask, then `mac join abp`. Only an
//!   `accepted` join makes the session eligible for uplinks.
//! - **CW**: reset, select LoRa modulation, pause the MAC. The session can
//!   then key the raw carrier in the [`CW_PATTERN`].
//!
//! Every operation is strictly sequential: one command, one response line
//! (or a timeout), then the next command. Join and transmit outcomes are
//! returned as values; only transport-level failures and checked
//! configuration mismatches are errors.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use loramote_core::error::{Error, Result};
use loramote_core::transport::Transport;
use loramote_core::types::{
    AbpCredentials, DevAddr, HexPayload, JoinOutcome, Rx2Params, SessionState, SyncWord,
    TransmitOutcome,
};
use loramote_line_io::{CommandChannel, ResponseCheck};

use crate::channels::{ChannelMask, SubBand};
use crate::commands;
use crate::cw::CW_PATTERN;

/// Link parameters fixed at build time.
#[derive(Debug, Clone)]
pub(crate) struct SessionParams {
    pub(crate) credentials: Option<AbpCredentials>,
    pub(crate) sync_word: SyncWord,
    pub(crate) rx2: Rx2Params,
    pub(crate) sub_band: SubBand,
    pub(crate) tx_port: u8,
    /// Applied to configuration and carrier commands. `sys reset` is never
    /// checked since the module answers it with a version banner.
    pub(crate) response_check: ResponseCheck,
    /// Applied to the synchronous answer of `mac tx`.
    pub(crate) tx_ack_check: ResponseCheck,
}

/// An open session with one RN2903 module.
///
/// Constructed via [`MoteBuilder`](crate::builder::MoteBuilder).
pub struct MoteSession {
    channel: CommandChannel,
    params: SessionParams,
    state: SessionState,
}

impl MoteSession {
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        read_timeout: Duration,
        params: SessionParams,
    ) -> Self {
        MoteSession {
            channel: CommandChannel::new(transport, read_timeout),
            params,
            state: SessionState::Unconfigured,
        }
    }

    /// Current position in the setup sequence.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the last join was accepted.
    pub fn is_joined(&self) -> bool {
        self.state.can_transmit()
    }

    /// The device address this session joins with, if credentials were set.
    pub fn dev_addr(&self) -> Option<&DevAddr> {
        self.params.credentials.as_ref().map(|c| &c.dev_addr)
    }

    /// The bound applied to every response wait.
    pub fn read_timeout(&self) -> Duration {
        self.channel.read_timeout()
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    // ---------------------------------------------------------------
    // ABP
    // ---------------------------------------------------------------

    /// Provision the ABP session and join.
    ///
    /// Sends `sys reset`, the six credential and radio commands, one
    /// `mac set ch status` per channel slot, then `mac join abp`. The join
    /// is acknowledged with `ok` and then answered with `accepted`; any
    /// other first answer is the module refusing to start the join and is
    /// reported as rejected with its text. A join that is rejected or never
    /// answered is returned as an `Ok(JoinOutcome)` and leaves the session
    /// in a terminal failure state; it is not retried.
    ///
    /// Returns [`Error::InvalidParameter`] without sending anything if the
    /// session was built without ABP credentials.
    pub async fn join_abp(&mut self) -> Result<JoinOutcome> {
        let creds = self.params.credentials.as_ref().ok_or_else(|| {
            Error::InvalidParameter("ABP credentials are required to join".into())
        })?;
        info!(dev_addr = %creds.dev_addr, "configuring ABP session");

        let setup = [
            commands::cmd_set_devaddr(&creds.dev_addr),
            commands::cmd_set_appskey(&creds.app_session_key),
            commands::cmd_set_nwkskey(&creds.network_session_key),
            commands::cmd_set_adr(false),
            commands::cmd_set_sync(self.params.sync_word),
            commands::cmd_set_rx2(self.params.rx2),
        ];

        self.reset().await?;

        for cmd in &setup {
            self.configure(cmd).await?;
        }
        self.transition(SessionState::CredentialsSet);

        let mask = ChannelMask::with_sub_band(self.params.sub_band);
        debug!(sub_band = %self.params.sub_band, "pushing channel mask");
        for cmd in mask.commands() {
            self.configure(&cmd).await?;
        }
        self.transition(SessionState::ChannelsConfigured);

        self.request_join().await
    }

    async fn request_join(&mut self) -> Result<JoinOutcome> {
        let cmd = commands::cmd_join_abp();
        let ack = match self.channel.send(&cmd).await {
            Ok(ack) => ack,
            Err(Error::Timeout) => return Ok(self.join_timed_out()),
            Err(e) => return Err(e),
        };
        self.transition(SessionState::JoinRequested);
        if ack != commands::RESP_OK {
            // Refused locally (`keys_not_init`, `no_free_ch`, `busy`, ...);
            // no second line follows.
            return Ok(self.join_rejected(ack));
        }
        debug!("join request acknowledged");

        match self.channel.read_next().await {
            Ok(line) if line == commands::RESP_ACCEPTED => {
                self.transition(SessionState::Joined);
                info!("join accepted");
                Ok(JoinOutcome::Accepted)
            }
            Ok(line) => Ok(self.join_rejected(line)),
            Err(Error::Timeout) => Ok(self.join_timed_out()),
            Err(e) => Err(e),
        }
    }

    fn join_rejected(&mut self, response: String) -> JoinOutcome {
        self.transition(SessionState::JoinRejected);
        warn!(%response, "join rejected");
        JoinOutcome::Rejected { response }
    }

    fn join_timed_out(&mut self) -> JoinOutcome {
        self.transition(SessionState::JoinTimedOut);
        warn!("no answer to join request");
        JoinOutcome::TimedOut
    }

    // ---------------------------------------------------------------
    // Uplink
    // ---------------------------------------------------------------

    /// Send `payload` as an unconfirmed uplink and wait for its delivery
    /// status.
    ///
    /// The payload hex goes out exactly as given. The first answer is the
    /// module's local acknowledgment; the second, which arrives after the
    /// radio exchange, must be exactly `mac_tx_ok` for the uplink to count
    /// as delivered. Failures are reported in the returned outcome and are
    /// not retried.
    ///
    /// Returns [`Error::NotJoined`] without writing anything unless the
    /// last join was accepted.
    pub async fn send_message(&mut self, payload: &HexPayload) -> Result<TransmitOutcome> {
        if !self.state.can_transmit() {
            return Err(Error::NotJoined);
        }

        let cmd = commands::cmd_tx_uncnf(self.params.tx_port, payload);
        info!(port = self.params.tx_port, bytes = payload.byte_len(), "sending uplink");

        let ack = match self.channel.send(&cmd).await {
            Ok(ack) => ack,
            Err(Error::Timeout) => {
                warn!("no acknowledgment for uplink");
                return Ok(TransmitOutcome::TimedOut { ack: String::new() });
            }
            Err(e) => return Err(e),
        };

        if self.params.tx_ack_check.verify(&cmd, &ack).is_err() {
            warn!(%ack, "uplink refused by module");
            return Ok(TransmitOutcome::Rejected { ack });
        }

        match self.channel.read_next().await {
            Ok(line) if line == commands::RESP_MAC_TX_OK => {
                info!("uplink delivered");
                Ok(TransmitOutcome::Delivered { ack })
            }
            Ok(response) => {
                warn!(%response, "uplink failed");
                Ok(TransmitOutcome::Failed { ack, response })
            }
            Err(Error::Timeout) => {
                warn!("no delivery status for uplink");
                Ok(TransmitOutcome::TimedOut { ack })
            }
            Err(e) => Err(e),
        }
    }

    // ---------------------------------------------------------------
    // CW
    // ---------------------------------------------------------------

    /// Prepare the module for raw carrier control.
    pub async fn configure_cw(&mut self) -> Result<()> {
        self.reset().await?;

        self.configure(&commands::cmd_radio_set_mod_lora()).await?;
        self.transition(SessionState::ModulationSet);

        self.pause_mac().await?;
        self.transition(SessionState::CwReady);
        Ok(())
    }

    /// Run one repetition of the CW pattern. The carrier is off when this
    /// returns successfully.
    ///
    /// Returns [`Error::InvalidState`] unless [`configure_cw`](Self::configure_cw)
    /// has completed.
    pub async fn cw_cycle(&mut self) -> Result<()> {
        self.require_cw_ready()?;
        for step in &CW_PATTERN {
            self.configure(&commands::cmd_radio_cw(step.carrier_on))
                .await?;
            tokio::time::sleep(step.hold).await;
        }
        Ok(())
    }

    /// Repeat the CW pattern until `cancel` fires.
    ///
    /// The token is checked between repetitions, so a cancellation always
    /// lets the current repetition finish with the carrier off. Returns the
    /// number of completed repetitions.
    pub async fn run_cw(&mut self, cancel: &CancellationToken) -> Result<u64> {
        self.require_cw_ready()?;
        info!("starting CW test pattern");

        let mut cycles = 0u64;
        while !cancel.is_cancelled() {
            self.cw_cycle().await?;
            cycles += 1;
            debug!(cycles, "CW repetition complete");
        }

        info!(cycles, "CW test pattern stopped");
        Ok(cycles)
    }

    fn require_cw_ready(&self) -> Result<()> {
        if self.state.can_key_carrier() {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "carrier control needs CW setup (session is {})",
                self.state
            )))
        }
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Close the serial connection.
    pub async fn close(&mut self) -> Result<()> {
        info!("closing session");
        self.channel.close().await
    }

    /// Give the transport back to the caller.
    pub fn into_transport(self) -> Box<dyn Transport> {
        self.channel.into_transport()
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    async fn reset(&mut self) -> Result<()> {
        let cmd = commands::cmd_sys_reset();
        match self.channel.send(&cmd).await {
            Ok(banner) => debug!(%banner, "module reset"),
            Err(Error::Timeout) => warn!("no answer to reset, continuing"),
            Err(e) => return Err(e),
        }
        self.transition(SessionState::ResetIssued);
        Ok(())
    }

    /// Send a configuration command and consume its answer according to
    /// the response policy.
    ///
    /// Unchecked commands tolerate a silent module; checked ones treat a
    /// timeout as a failure.
    async fn configure(&mut self, cmd: &str) -> Result<()> {
        match self.params.response_check {
            ResponseCheck::Unchecked => match self.channel.send(cmd).await {
                Ok(_) => Ok(()),
                Err(Error::Timeout) => {
                    warn!(command = cmd, "no answer, continuing");
                    Ok(())
                }
                Err(e) => Err(e),
            },
            check => self.channel.transact(cmd, check).await.map(|_| ()),
        }
    }

    /// `mac pause` answers with the pause length in milliseconds rather
    /// than `ok`, so a checked session validates it as a number.
    async fn pause_mac(&mut self) -> Result<()> {
        let cmd = commands::cmd_mac_pause();
        let response = match self.channel.send(&cmd).await {
            Ok(response) => response,
            Err(Error::Timeout) if self.params.response_check == ResponseCheck::Unchecked => {
                warn!(command = %cmd, "no answer, continuing");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match response.parse::<u32>() {
            Ok(pause_ms) => debug!(pause_ms, "MAC paused"),
            Err(_) if self.params.response_check == ResponseCheck::Unchecked => {
                debug!(%response, "MAC pause answered")
            }
            Err(_) => {
                return Err(Error::UnexpectedResponse {
                    command: cmd,
                    expected: "pause length in milliseconds",
                    received: response,
                })
            }
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "session state");
        self.state = next;
    }
}
