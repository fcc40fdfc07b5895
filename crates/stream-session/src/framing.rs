//! `delimited=length` framing.
//!
//! Each record is preceded by its byte length in decimal and `\r\n`.
//! Blank lines between records are keep-alives.

use bytes::{Buf, Bytes, BytesMut};
use reconnect_policy::TransportError;

/// Longest length prefix accepted before the line is considered garbage.
const MAX_PREFIX_LEN: usize = 32;

/// Largest record a prefix may announce. Real records are a few KiB.
pub const MAX_RECORD_LEN: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Record(Bytes),
    KeepAlive,
}

/// Incremental decoder; feed chunks with [`push`](Self::push), drain with
/// [`next_frame`](Self::next_frame).
#[derive(Debug, Default)]
pub struct LengthDelimitedFramer {
    buffer: BytesMut,
    pending_len: Option<usize>,
}

impl LengthDelimitedFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Bytes received but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Next complete frame, `Ok(None)` if more bytes are needed.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        loop {
            if let Some(len) = self.pending_len {
                if self.buffer.len() < len {
                    return Ok(None);
                }
                self.pending_len = None;
                return Ok(Some(Frame::Record(self.buffer.split_to(len).freeze())));
            }

            let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') else {
                if self.buffer.len() > MAX_PREFIX_LEN {
                    return Err(TransportError::Unknown(
                        "length prefix exceeds 32 bytes without a line break".into(),
                    ));
                }
                return Ok(None);
            };

            let line = self.buffer.split_to(newline + 1);
            let text = std::str::from_utf8(&line)
                .map_err(|_| TransportError::Unknown("length prefix is not UTF-8".into()))?
                .trim();

            if text.is_empty() {
                return Ok(Some(Frame::KeepAlive));
            }

            let len: usize = text
                .parse()
                .map_err(|_| TransportError::Unknown(format!("invalid length prefix {text:?}")))?;
            if len == 0 {
                return Ok(Some(Frame::KeepAlive));
            }
            if len > MAX_RECORD_LEN {
                return Err(TransportError::Unknown(format!(
                    "length prefix {len} exceeds {MAX_RECORD_LEN} bytes"
                )));
            }
            self.pending_len = Some(len);
        }
    }

    /// Discard everything buffered.
    pub fn clear(&mut self) {
        self.buffer.advance(self.buffer.len());
        self.pending_len = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(framer: &mut LengthDelimitedFramer) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = framer.next_frame().unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn decodes_records_and_keepalives() {
        let mut framer = LengthDelimitedFramer::new();
        framer.push(b"\r\n7\r\n{\"a\":1}\r\n5\r\nhello");

        assert_eq!(
            drain(&mut framer),
            vec![
                Frame::KeepAlive,
                Frame::Record(Bytes::from_static(b"{\"a\":1}")),
                Frame::KeepAlive,
                Frame::Record(Bytes::from_static(b"hello")),
            ]
        );
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn record_length_includes_trailing_crlf() {
        let mut framer = LengthDelimitedFramer::new();
        framer.push(b"9\r\n{\"a\":1}\r\n");
        assert_eq!(
            drain(&mut framer),
            vec![Frame::Record(Bytes::from_static(b"{\"a\":1}\r\n"))]
        );
    }

    #[test]
    fn handles_arbitrary_chunk_boundaries() {
        let wire = b"1";
        let mut framer = LengthDelimitedFramer::new();
        framer.push(wire);
        assert_eq!(framer.next_frame().unwrap(), None);

        framer.push(b"2\r");
        assert_eq!(framer.next_frame().unwrap(), None);
        framer.push(b"\nhello ");
        assert_eq!(framer.next_frame().unwrap(), None);
        framer.push(b"world!");
        assert_eq!(
            framer.next_frame().unwrap(),
            Some(Frame::Record(Bytes::from_static(b"hello world!")))
        );
    }

    #[test]
    fn byte_at_a_time() {
        let wire = b"3\r\nabc\r\n2\r\nde";
        let mut framer = LengthDelimitedFramer::new();
        let mut frames = Vec::new();
        for byte in wire {
            framer.push(&[*byte]);
            frames.extend(drain(&mut framer));
        }
        assert_eq!(
            frames,
            vec![
                Frame::Record(Bytes::from_static(b"abc")),
                Frame::KeepAlive,
                Frame::Record(Bytes::from_static(b"de")),
            ]
        );
    }

    #[test]
    fn rejects_non_numeric_prefix() {
        let mut framer = LengthDelimitedFramer::new();
        framer.push(b"{\"not\":\"delimited\"}\r\n");
        assert!(matches!(framer.next_frame(), Err(TransportError::Unknown(_))));
    }

    #[test]
    fn rejects_runaway_prefix() {
        let mut framer = LengthDelimitedFramer::new();
        framer.push(&[b'9'; 64]);
        assert!(framer.next_frame().is_err());
    }

    #[test]
    fn rejects_oversized_record_before_buffering_it() {
        let mut framer = LengthDelimitedFramer::new();
        framer.push(format!("{}\r\n", MAX_RECORD_LEN + 1).as_bytes());
        framer.push(b"abc");
        assert!(matches!(framer.next_frame(), Err(TransportError::Unknown(_))));

        let mut framer = LengthDelimitedFramer::new();
        framer.push(format!("{}\r\n", usize::MAX).as_bytes());
        assert!(matches!(framer.next_frame(), Err(TransportError::Unknown(_))));
    }

    #[test]
    fn accepts_record_at_size_limit() {
        let mut framer = LengthDelimitedFramer::new();
        framer.push(format!("{MAX_RECORD_LEN}\r\n").as_bytes());
        assert_eq!(framer.next_frame().unwrap(), None);
        framer.push(&vec![b'x'; MAX_RECORD_LEN]);
        match framer.next_frame().unwrap() {
            Some(Frame::Record(bytes)) => assert_eq!(bytes.len(), MAX_RECORD_LEN),
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn clear_drops_partial_record() {
        let mut framer = LengthDelimitedFramer::new();
        framer.push(b"10\r\nabc");
        assert_eq!(framer.next_frame().unwrap(), None);
        framer.clear();
        framer.push(b"2\r\nok");
        assert_eq!(
            framer.next_frame().unwrap(),
            Some(Frame::Record(Bytes::from_static(b"ok")))
        );
    }
}
