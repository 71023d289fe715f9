//! Header framing over a raw byte stream.
//!
//! ```text
//! [UTF-8 JSON header][\r\n\r\n][payload bytes ... until EOF or declared size]
//! ```
//!
//! The header has no length prefix, so the receiver scans for the sentinel.
//! The sentinel may straddle two reads, and the first payload bytes may share
//! a read with the end of the header; [`FrameDecoder`] handles both and hands
//! any payload bytes it swallowed back to the caller.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::ProtocolError;
use crate::constants::{CHUNK_SIZE, SENTINEL};

/// A decoded header plus the payload bytes that arrived alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<T> {
    pub header: T,
    /// Bytes that followed the sentinel in the same read. May be empty.
    pub payload: Vec<u8>,
}

/// Incremental header decoder with a bounded accumulation buffer.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    /// Prefix of `buf` already known not to contain the sentinel start.
    scanned: usize,
    max_header_size: usize,
}

impl FrameDecoder {
    /// Creates a decoder that rejects headers longer than `max_header_size`.
    pub fn new(max_header_size: usize) -> Self {
        Self {
            buf: Vec::new(),
            scanned: 0,
            max_header_size,
        }
    }

    /// Appends `data` and tries to complete the header.
    ///
    /// Returns `Ok(None)` while the sentinel has not been seen yet.
    pub fn feed<T: DeserializeOwned>(
        &mut self,
        data: &[u8],
    ) -> Result<Option<Frame<T>>, ProtocolError> {
        self.buf.extend_from_slice(data);

        // Rescan the tail in case the sentinel started in the previous read.
        let start = self.scanned.saturating_sub(SENTINEL.len() - 1);
        let Some(pos) = find_sentinel(&self.buf[start..]) else {
            self.scanned = self.buf.len();
            if self.buf.len() >= self.max_header_size + SENTINEL.len() {
                return Err(ProtocolError::HeaderTooLarge {
                    limit: self.max_header_size,
                });
            }
            return Ok(None);
        };

        let header_end = start + pos;
        if header_end > self.max_header_size {
            return Err(ProtocolError::HeaderTooLarge {
                limit: self.max_header_size,
            });
        }

        let text = std::str::from_utf8(&self.buf[..header_end])?;
        let header = serde_json::from_str(text)?;
        let payload = self.buf.split_off(header_end + SENTINEL.len());
        self.buf.clear();
        self.scanned = 0;

        Ok(Some(Frame { header, payload }))
    }

    /// Bytes accumulated so far without a complete header.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    pub fn max_header_size(&self) -> usize {
        self.max_header_size
    }
}

fn find_sentinel(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(SENTINEL.len())
        .position(|window| window == SENTINEL)
}

/// Reads from `reader` until `decoder` yields a frame.
///
/// Returns `Ok(None)` on EOF before a sentinel; whatever arrived is left in
/// [`FrameDecoder::buffered`] for the caller to inspect.
pub async fn read_frame<R, T>(
    reader: &mut R,
    decoder: &mut FrameDecoder,
) -> Result<Option<Frame<T>>, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        if let Some(frame) = decoder.feed(&buf[..n])? {
            return Ok(Some(frame));
        }
    }
}

/// Serializes `header` as JSON followed by the sentinel.
pub fn encode_frame<T: Serialize>(header: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = serde_json::to_vec(header)?;
    bytes.extend_from_slice(SENTINEL);
    Ok(bytes)
}

/// Writes a framed header. Does not flush.
pub async fn write_frame<W, T>(writer: &mut W, header: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = encode_frame(header)?;
    writer.write_all(&bytes).await?;
    Ok(())
}
