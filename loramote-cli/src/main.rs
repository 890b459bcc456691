// loramote -- drive a Microchip LoRaMOTE (RN2903) from the command line.
//
// Usage:
//   loramote cw /dev/ttyACM0 AABBCCDD 5
//   loramote send /dev/ttyACM0 AABBCCDD DEADBEEF
//   loramote --verify --check-tx-ack send COM3 AABBCCDD 0102
//
// `cw` keys the carrier in a repeating burst pattern until Ctrl-C. `send`
// provisions an ABP session, joins, and sends one unconfirmed uplink.
// Set RUST_LOG (e.g. RUST_LOG=debug) to see every command and response.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use loramote_core::types::{AbpCredentials, DevAddr, HexPayload, JoinOutcome, SessionKey};
use loramote_core::Error;
use loramote_rn2903::{us915_lora_mote, MoteBuilder, MoteSession, ResponseCheck};

/// Session key used when none is given on the command line.
const DEFAULT_KEY: &str = "2B7E151628AED2A6ABF7158809CF4F3C";

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// LoRaMOTE test tool -- CW bursts and ABP uplinks over the RN2903 UART.
#[derive(Parser)]
#[command(name = "loramote", version, about)]
struct Cli {
    /// Serial baud rate.
    #[arg(long, global = true, default_value_t = 57_600)]
    baud: u32,

    /// Seconds to wait for each response line.
    #[arg(long, global = true, default_value_t = 8, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Application session key (32 hex digits).
    #[arg(long, global = true, default_value = DEFAULT_KEY)]
    appskey: SessionKey,

    /// Network session key (32 hex digits).
    #[arg(long, global = true, default_value = DEFAULT_KEY)]
    nwkskey: SessionKey,

    /// Require `ok` in answer to every configuration command.
    #[arg(long, global = true)]
    verify: bool,

    /// Require `ok` as the local acknowledgment of an uplink.
    #[arg(long, global = true)]
    check_tx_ack: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Key the carrier in a repeating burst pattern until Ctrl-C.
    Cw {
        /// Serial port path (e.g. /dev/ttyACM0, COM3).
        port: String,
        /// Device address. Only logged; CW does not join.
        dev_addr: String,
        /// Repetition period. Accepted for compatibility; the burst
        /// pattern has a fixed length.
        period: i64,
    },
    /// Join with ABP and send one unconfirmed uplink.
    Send {
        /// Serial port path (e.g. /dev/ttyACM0, COM3).
        port: String,
        /// Device address (hex).
        dev_addr: DevAddr,
        /// Payload as an even number of hex digits, sent as given.
        data: HexPayload,
    },
}

// ---------------------------------------------------------------------------
// Session construction
// ---------------------------------------------------------------------------

async fn open_session(
    cli: &Cli,
    port: &str,
    credentials: Option<AbpCredentials>,
) -> Result<MoteSession> {
    let response_check = if cli.verify {
        ResponseCheck::OK
    } else {
        ResponseCheck::Unchecked
    };

    let mut builder = MoteBuilder::new(us915_lora_mote())
        .serial_port(port)
        .baud_rate(cli.baud)
        .read_timeout(Duration::from_secs(cli.timeout))
        .response_check(response_check)
        .check_tx_ack(cli.check_tx_ack);
    if let Some(credentials) = credentials {
        builder = builder.abp_credentials(credentials);
    }

    builder
        .build()
        .await
        .with_context(|| format!("failed to open serial port {port} at {} baud", cli.baud))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_cw(session: &mut MoteSession, period: i64) -> Result<()> {
    info!(period, "CW period (pattern length is fixed)");
    session
        .configure_cw()
        .await
        .context("failed to prepare module for CW")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping after this repetition");
            on_signal.cancel();
        }
    });

    let cycles = session.run_cw(&cancel).await.context("CW pattern failed")?;
    info!(cycles, "CW done");
    Ok(())
}

async fn cmd_send(session: &mut MoteSession, data: &HexPayload) -> Result<()> {
    match session.join_abp().await.context("ABP join failed")? {
        JoinOutcome::Accepted => {}
        JoinOutcome::Rejected { response } => {
            warn!(%response, "join not accepted, nothing sent");
            return Ok(());
        }
        JoinOutcome::TimedOut => {
            warn!("join timed out, nothing sent");
            return Ok(());
        }
    }

    let outcome = session
        .send_message(data)
        .await
        .context("failed to send uplink")?;
    if outcome.is_delivered() {
        info!(%data, "message sent");
    } else {
        warn!(%data, %outcome, "message not delivered");
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Cw {
            port,
            dev_addr,
            period,
        } => {
            info!(%dev_addr, "CW test");
            let mut session = open_session(&cli, port, None).await?;
            let result = cmd_cw(&mut session, *period).await;
            session.close().await.ok();
            result
        }
        Command::Send {
            port,
            dev_addr,
            data,
        } => {
            let credentials = AbpCredentials {
                dev_addr: dev_addr.clone(),
                app_session_key: cli.appskey.clone(),
                network_session_key: cli.nwkskey.clone(),
            };
            let mut session = open_session(&cli, port, Some(credentials)).await?;
            let result = cmd_send(&mut session, data).await;
            session.close().await.ok();
            result
        }
    }
}

/// Protocol-level failures are reported but are not a tool failure.
fn is_protocol_failure(err: &anyhow::Error) -> bool {
    err.downcast_ref::<Error>()
        .is_some_and(Error::is_protocol_mismatch)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Usage problems print help and exit cleanly without touching
            // the port.
            err.print().ok();
            return Ok(());
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match run(cli).await {
        Err(err) if is_protocol_failure(&err) => {
            error!("{err:#}");
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_send_with_defaults() {
        let cli = Cli::try_parse_from(["loramote", "send", "/dev/ttyACM0", "AABBCCDD", "DEADBEEF"])
            .unwrap();
        assert_eq!(cli.baud, 57_600);
        assert_eq!(cli.timeout, 8);
        assert_eq!(cli.appskey.as_str(), DEFAULT_KEY);
        assert!(!cli.verify);
        match cli.command {
            Command::Send { port, data, .. } => {
                assert_eq!(port, "/dev/ttyACM0");
                assert_eq!(data.as_str(), "DEADBEEF");
            }
            Command::Cw { .. } => panic!("parsed as cw"),
        }
    }

    #[test]
    fn parse_cw_with_global_flags() {
        let cli = Cli::try_parse_from([
            "loramote", "cw", "COM3", "01", "5", "--verify", "--baud", "9600",
        ])
        .unwrap();
        assert!(cli.verify);
        assert_eq!(cli.baud, 9600);
        assert!(matches!(cli.command, Command::Cw { period: 5, .. }));
    }

    #[test]
    fn cw_accepts_any_device_address() {
        let cli = Cli::try_parse_from(["loramote", "cw", "COM3", "mote-7", "1"]).unwrap();
        match cli.command {
            Command::Cw { dev_addr, .. } => assert_eq!(dev_addr, "mote-7"),
            Command::Send { .. } => panic!("parsed as send"),
        }
        // `send` still needs a hex address.
        assert!(Cli::try_parse_from(["loramote", "send", "COM3", "mote-7", "AB"]).is_err());
    }

    #[test]
    fn usage_errors_are_rejected_by_the_parser() {
        // Missing argument.
        assert!(Cli::try_parse_from(["loramote", "send", "/dev/ttyACM0", "AABBCCDD"]).is_err());
        // Period must be an integer.
        assert!(Cli::try_parse_from(["loramote", "cw", "COM3", "01", "fast"]).is_err());
        // Odd-length payload.
        assert!(Cli::try_parse_from(["loramote", "send", "COM3", "01", "ABC"]).is_err());
        // Short key.
        assert!(Cli::try_parse_from(["loramote", "--appskey", "00", "send", "COM3", "01", "AB"]).is_err());
        // Zero timeout.
        assert!(Cli::try_parse_from(["loramote", "--timeout", "0", "send", "COM3", "01", "AB"]).is_err());
    }

    #[test]
    fn protocol_failures_are_recognised_through_context() {
        let err = anyhow::Error::new(Error::NotJoined).context("failed to send uplink");
        assert!(is_protocol_failure(&err));

        let err = anyhow::Error::new(Error::Transport("no such port".into())).context("open");
        assert!(!is_protocol_failure(&err));
    }
}
