//! Line encode/decode for the RN2903 ASCII protocol.
//!
//! Commands go out as `<text>\r\n`. Responses are read up to the next `\n`
//! and stripped of trailing whitespace, which also removes the `\r`. The
//! module never sends multi-line answers to a single read, so one line is
//! always one response.

use bytes::{BufMut, BytesMut};

use loramote_core::error::{Error, Result};

/// Terminator appended to every command line.
pub const TERMINATOR: &[u8] = b"\r\n";

/// Byte that ends a received line.
pub const LINE_END: u8 = b'\n';

/// Result of attempting to decode one line from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    /// A complete line was decoded.
    Line {
        /// Line text with trailing whitespace removed.
        text: String,
        /// Number of bytes consumed from the input buffer, terminator included.
        consumed: usize,
    },

    /// The buffer does not yet contain a complete line.
    Incomplete,
}

/// Encode a command into raw bytes ready for transmission.
///
/// The command must be ASCII and must not contain line terminators; the
/// module would split it into two commands otherwise.
///
/// ```
/// use loramote_line_io::protocol::encode_command;
///
/// assert_eq!(encode_command("mac pause").unwrap(), b"mac pause\r\n");
/// assert!(encode_command("mac pause\r\nsys reset").is_err());
/// ```
pub fn encode_command(command: &str) -> Result<Vec<u8>> {
    if command.bytes().any(|b| b == b'\r' || b == b'\n') {
        return Err(Error::InvalidParameter(format!(
            "command contains a line terminator: {command:?}"
        )));
    }
    if !command.is_ascii() {
        return Err(Error::InvalidParameter(format!(
            "command is not ASCII: {command:?}"
        )));
    }

    let mut buf = BytesMut::with_capacity(command.len() + TERMINATOR.len());
    buf.put_slice(command.as_bytes());
    buf.put_slice(TERMINATOR);
    Ok(buf.to_vec())
}

/// Decode one line from the front of `buf`.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected; the
/// module prints noise on the line around a reset and that must not abort
/// the exchange.
pub fn decode_line(buf: &[u8]) -> DecodeResult {
    let Some(end) = buf.iter().position(|&b| b == LINE_END) else {
        return DecodeResult::Incomplete;
    };

    let text = String::from_utf8_lossy(&buf[..end]).trim_end().to_string();
    DecodeResult::Line {
        text,
        consumed: end + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_appends_crlf() {
        assert_eq!(
            encode_command("mac tx uncnf 1 DEADBEEF").unwrap(),
            b"mac tx uncnf 1 DEADBEEF\r\n"
        );
    }

    #[test]
    fn encode_rejects_embedded_terminators() {
        assert!(matches!(
            encode_command("sys reset\n"),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            encode_command("sys\rreset"),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn encode_rejects_non_ascii() {
        assert!(encode_command("mac set devaddr ÄÄ").is_err());
    }

    #[test]
    fn decode_empty_buffer() {
        assert_eq!(decode_line(b""), DecodeResult::Incomplete);
    }

    #[test]
    fn decode_no_terminator() {
        assert_eq!(decode_line(b"mac_tx_o"), DecodeResult::Incomplete);
    }

    #[test]
    fn decode_strips_crlf() {
        assert_eq!(
            decode_line(b"accepted\r\n"),
            DecodeResult::Line {
                text: "accepted".into(),
                consumed: 10,
            }
        );
    }

    #[test]
    fn decode_bare_lf() {
        assert_eq!(
            decode_line(b"ok\n"),
            DecodeResult::Line {
                text: "ok".into(),
                consumed: 3,
            }
        );
    }

    #[test]
    fn decode_strips_trailing_spaces_only() {
        assert_eq!(
            decode_line(b" ok  \r\n"),
            DecodeResult::Line {
                text: " ok".into(),
                consumed: 7,
            }
        );
    }

    #[test]
    fn decode_blank_line_is_a_line() {
        assert_eq!(
            decode_line(b"\r\n"),
            DecodeResult::Line {
                text: String::new(),
                consumed: 2,
            }
        );
    }

    #[test]
    fn decode_first_of_two() {
        assert_eq!(
            decode_line(b"ok\r\nmac_tx_ok\r\n"),
            DecodeResult::Line {
                text: "ok".into(),
                consumed: 4,
            }
        );
    }

    #[test]
    fn decode_non_utf8_is_replaced() {
        let buf = [0xFF, b'o', b'k', b'\r', b'\n'];
        match decode_line(&buf) {
            DecodeResult::Line { text, consumed } => {
                assert!(text.ends_with("ok"));
                assert_eq!(consumed, 5);
            }
            DecodeResult::Incomplete => panic!("expected a line"),
        }
    }
}
