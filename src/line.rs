//! Line codec for tokio.
//!
//! Splits the inbound byte stream on `\r\n`, `\r` or `\n`, holding back an
//! unterminated tail until more bytes arrive. Empty lines are skipped and
//! invalid UTF-8 is replaced rather than rejected, so one bad line never
//! tears down the connection. Lines longer than the limit are discarded.

use std::io;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// Longest inbound line accepted, in bytes (IRCv3 tags included).
pub const MAX_LINE_LEN: usize = 8191;

/// Line-based codec yielding one `String` per non-empty line.
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Index of next byte to check for a terminator.
    next_index: usize,
    max_len: usize,
    /// Dropping the remainder of an oversize line.
    discarding: bool,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        LineCodec {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }
}

#[inline]
fn is_terminator(b: &u8) -> bool {
    *b == b'\n' || *b == b'\r'
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<String>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(is_terminator) else {
                self.next_index = src.len();
                if src.len() > self.max_len {
                    if !self.discarding {
                        warn!(limit = self.max_len, "discarding oversize inbound line");
                    }
                    self.discarding = true;
                    src.clear();
                    self.next_index = 0;
                }
                return Ok(None);
            };

            let end = self.next_index + offset;
            let line = src.split_to(end + 1);
            self.next_index = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }

            let line = &line[..end];
            if line.is_empty() {
                continue;
            }
            if line.len() > self.max_len {
                warn!(len = line.len(), limit = self.max_len, "discarding oversize inbound line");
                continue;
            }

            return Ok(Some(String::from_utf8_lossy(line).into_owned()));
        }
    }

    /// An unterminated tail at end of stream still counts as a line.
    fn decode_eof(&mut self, src: &mut BytesMut) -> io::Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        let tail = src.split();
        if std::mem::take(&mut self.discarding) || tail.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&tail).into_owned()))
    }
}

impl Encoder<String> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> io::Result<()> {
        dst.extend_from_slice(line.as_bytes());
        Ok(())
    }
}
