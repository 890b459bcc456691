//! Mock transport for deterministic testing of the driver stack.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. Because the session controller takes ownership
//! of its transport, all state lives behind a shared [`MockHandle`] that
//! tests keep to inspect what was sent, and when.
//!
//! # Example
//!
//! ```
//! use loramote_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // `sys reset` answers with a version banner.
//! mock.expect_line("sys reset", &["RN2903 1.0.3 Aug  8 2017 15:11:09"]);
//! // `mac tx` answers twice: the local ack, then the delivery status.
//! mock.expect_line("mac tx uncnf 1 DEADBEEF", &["ok", "mac_tx_ok"]);
//! let handle = mock.handle();
//! assert_eq!(handle.remaining_expectations(), 2);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use loramote_core::error::{Error, Result};
use loramote_core::transport::Transport;

/// Line terminator the module uses in both directions.
const CRLF: &[u8] = b"\r\n";

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// The bytes made readable once the matching request is received.
    response: Vec<u8>,
    /// Report the write as timed out (the bytes still "reach" the module).
    write_timeout: bool,
}

/// One `send()` call as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    /// Tokio clock reading when the bytes were sent.
    pub at: Instant,
    /// The bytes passed to `send()`.
    pub data: Vec<u8>,
}

#[derive(Debug)]
struct MockState {
    expectations: VecDeque<Expectation>,
    /// Bytes the module has "written" that have not been read yet.
    inbound: VecDeque<u8>,
    connected: bool,
    sent_log: Vec<SentRecord>,
    /// Largest chunk a single `receive()` hands back.
    chunk_size: usize,
}

/// Shared view of a [`MockTransport`]'s state.
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panic in another test thread must not hide this test's result.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every `send()` call so far, in order.
    pub fn records(&self) -> Vec<SentRecord> {
        self.lock().sent_log.clone()
    }

    /// Sent data decoded as text, with the trailing CRLF removed.
    pub fn sent_lines(&self) -> Vec<String> {
        self.lock()
            .sent_log
            .iter()
            .map(|r| {
                let data = r.data.strip_suffix(CRLF).unwrap_or(&r.data);
                String::from_utf8_lossy(data).into_owned()
            })
            .collect()
    }

    /// Number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.lock().expectations.len()
    }

    /// Make `data` readable without a preceding request, as if the module
    /// had emitted it on its own.
    pub fn inject(&self, data: &[u8]) {
        self.lock().inbound.extend(data.iter().copied());
    }

    /// Set the connected state of the mock transport.
    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }
}

/// A mock [`Transport`] for testing without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation; its response
/// bytes are appended to the inbound stream that `receive()` reads from.
/// Leftover inbound bytes stay queued across exchanges, the same way a
/// real UART buffers a second line the module sends later.
///
/// `receive()` on an empty inbound stream sleeps for the requested timeout
/// and returns [`Error::Timeout`]; with a paused Tokio clock that costs no
/// wall time.
#[derive(Debug)]
pub struct MockTransport {
    handle: MockHandle,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            handle: MockHandle {
                state: Arc::new(Mutex::new(MockState {
                    expectations: VecDeque::new(),
                    inbound: VecDeque::new(),
                    connected: true,
                    sent_log: Vec::new(),
                    chunk_size: usize::MAX,
                })),
            },
        }
    }

    /// A handle that stays valid after the transport is moved away.
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }

    /// Add an expected request/response pair of raw bytes.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.push(request, response, false);
    }

    /// Expect `command` followed by CRLF, and answer with each of
    /// `responses` as its own CRLF-terminated line.
    ///
    /// An empty `responses` slice models a module that stays silent.
    pub fn expect_line(&mut self, command: &str, responses: &[&str]) {
        let (request, response) = line_pair(command, responses);
        self.push(&request, &response, false);
    }

    /// Like [`expect_line`](Self::expect_line), but the write reports
    /// [`Error::Timeout`] while the module still answers.
    pub fn expect_line_write_timeout(&mut self, command: &str, responses: &[&str]) {
        let (request, response) = line_pair(command, responses);
        self.push(&request, &response, true);
    }

    /// Limit how many bytes a single `receive()` returns, to exercise line
    /// reassembly.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.handle.lock().chunk_size = chunk_size.max(1);
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.handle.remaining_expectations()
    }

    /// Set the connected state of the mock transport.
    pub fn set_connected(&mut self, connected: bool) {
        self.handle.set_connected(connected);
    }

    fn push(&mut self, request: &[u8], response: &[u8], write_timeout: bool) {
        self.handle.lock().expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
            write_timeout,
        });
    }
}

fn line_pair(command: &str, responses: &[&str]) -> (Vec<u8>, Vec<u8>) {
    let mut request = command.as_bytes().to_vec();
    request.extend_from_slice(CRLF);
    let mut response = Vec::new();
    for line in responses {
        response.extend_from_slice(line.as_bytes());
        response.extend_from_slice(CRLF);
    }
    (request, response)
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.handle.lock();
        if !state.connected {
            return Err(Error::NotConnected);
        }

        state.sent_log.push(SentRecord {
            at: Instant::now(),
            data: data.to_vec(),
        });

        let expectation = state.expectations.pop_front().ok_or_else(|| {
            Error::Protocol(format!(
                "no more expectations in mock transport (sent {:?})",
                String::from_utf8_lossy(data)
            ))
        })?;
        if data != expectation.request.as_slice() {
            return Err(Error::Protocol(format!(
                "unexpected send data: expected {:?}, got {:?}",
                String::from_utf8_lossy(&expectation.request),
                String::from_utf8_lossy(data)
            )));
        }
        state.inbound.extend(expectation.response);
        if expectation.write_timeout {
            return Err(Error::Timeout);
        }
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        {
            let mut state = self.handle.lock();
            if !state.connected {
                return Err(Error::NotConnected);
            }
            if !state.inbound.is_empty() {
                let n = state.inbound.len().min(buf.len()).min(state.chunk_size);
                for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
        }

        tokio::time::sleep(timeout).await;
        Err(Error::Timeout)
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.handle.lock();
        state.connected = false;
        state.inbound.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.handle.lock().connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_transport_basic_send_receive() {
        let mut mock = MockTransport::new();
        mock.expect(b"sys get ver\r\n", b"RN2903 1.0.3\r\n");

        mock.send(b"sys get ver\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"RN2903 1.0.3\r\n");
    }

    #[tokio::test]
    async fn expect_line_frames_each_response() {
        let mut mock = MockTransport::new();
        mock.expect_line("mac join abp", &["ok", "accepted"]);

        mock.send(b"mac join abp\r\n").await.unwrap();
        let mut buf = [0u8; 64];
        let n = mock.receive(&mut buf, Duration::from_millis(10)).await.unwrap();
        assert_eq!(&buf[..n], b"ok\r\naccepted\r\n");
    }

    #[tokio::test]
    async fn handle_tracks_sent_lines() {
        let mut mock = MockTransport::new();
        mock.expect_line("radio cw on", &["ok"]);
        mock.expect_line("radio cw off", &["ok"]);
        let handle = mock.handle();

        mock.send(b"radio cw on\r\n").await.unwrap();
        mock.send(b"radio cw off\r\n").await.unwrap();

        assert_eq!(handle.sent_lines(), vec!["radio cw on", "radio cw off"]);
        assert_eq!(handle.records().len(), 2);
        assert_eq!(handle.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn mock_transport_wrong_data_errors() {
        let mut mock = MockTransport::new();
        mock.expect_line("mac pause", &["4294967245"]);

        let result = mock.send(b"mac resume\r\n").await;
        assert!(matches!(result.unwrap_err(), Error::Protocol(_)));
    }

    #[tokio::test]
    async fn mock_transport_no_expectations_errors() {
        let mut mock = MockTransport::new();
        let result = mock.send(b"sys reset\r\n").await;
        assert!(matches!(result.unwrap_err(), Error::Protocol(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn receive_on_silence_waits_for_timeout() {
        let mut mock = MockTransport::new();
        let mut buf = [0u8; 16];

        let start = Instant::now();
        let result = mock.receive(&mut buf, Duration::from_secs(8)).await;
        assert!(matches!(result.unwrap_err(), Error::Timeout));
        assert_eq!(start.elapsed(), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn write_timeout_still_delivers_response() {
        let mut mock = MockTransport::new();
        mock.expect_line_write_timeout("mac set adr off", &["ok"]);

        let result = mock.send(b"mac set adr off\r\n").await;
        assert!(matches!(result.unwrap_err(), Error::Timeout));

        let mut buf = [0u8; 16];
        let n = mock.receive(&mut buf, Duration::from_millis(10)).await.unwrap();
        assert_eq!(&buf[..n], b"ok\r\n");
    }

    #[tokio::test]
    async fn chunked_receive() {
        let mut mock = MockTransport::new();
        mock.expect_line("mac pause", &["4294967245"]);
        mock.set_chunk_size(4);

        mock.send(b"mac pause\r\n").await.unwrap();
        let mut buf = [0u8; 64];
        let n = mock.receive(&mut buf, Duration::from_millis(10)).await.unwrap();
        assert_eq!(&buf[..n], b"4294");
    }

    #[tokio::test]
    async fn injected_bytes_are_readable() {
        let mut mock = MockTransport::new();
        mock.handle().inject(b"mac_rx 1 AB\r\n");

        let mut buf = [0u8; 64];
        let n = mock.receive(&mut buf, Duration::from_millis(10)).await.unwrap();
        assert_eq!(&buf[..n], b"mac_rx 1 AB\r\n");
    }

    #[tokio::test]
    async fn mock_transport_disconnect() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.close().await.unwrap();
        assert!(!mock.is_connected());

        let result = mock.send(b"sys reset\r\n").await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));

        let mut buf = [0u8; 8];
        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));
    }
}
