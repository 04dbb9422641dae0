//! Length-prefixed frame codec.
//!
//! Each frame is a 4-byte unsigned little-endian length followed by exactly
//! that many bytes of UTF-8 JSON. There is no delimiter.
//!
//! # End of Stream
//!
//! | Where the stream ends | Result |
//! |-----------------------|--------|
//! | before the first prefix byte | `Ok(None)`, the peer closed the channel |
//! | inside the prefix or payload | [`Error::Io`] with `UnexpectedEof` |

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind};

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::Message;

// ============================================================================
// Constants
// ============================================================================

/// Size of the length prefix in bytes.
pub const PREFIX_LEN: usize = 4;

/// Largest inbound payload accepted before allocation (64 MiB).
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;

// ============================================================================
// Encoding
// ============================================================================

/// Serializes a message into a complete frame (prefix + payload).
///
/// # Errors
///
/// - [`Error::Json`] if serialization fails
/// - [`Error::FrameTooLarge`] if the payload does not fit a `u32` length
pub fn encode_frame(message: &Message) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(message)?;
    let len = u32::try_from(payload.len()).map_err(|_| Error::FrameTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;

    let mut frame = Vec::with_capacity(PREFIX_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decodes a frame payload. An empty payload is the zero-value message.
///
/// # Errors
///
/// Returns [`Error::Json`] if the payload is not a valid message.
pub fn decode_payload(payload: &[u8]) -> Result<Message> {
    if payload.is_empty() {
        return Ok(Message::default());
    }
    Ok(serde_json::from_slice(payload)?)
}

// ============================================================================
// FrameReader
// ============================================================================

/// Reads frames from a byte stream, one at a time.
pub struct FrameReader<R> {
    /// Underlying stream (stdin in production).
    inner: R,
    /// Largest accepted payload.
    max_frame: usize,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Creates a reader with the default size limit.
    #[inline]
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self::with_max_frame(inner, MAX_INBOUND_FRAME)
    }

    /// Creates a reader with a custom size limit.
    #[inline]
    #[must_use]
    pub fn with_max_frame(inner: R, max_frame: usize) -> Self {
        Self { inner, max_frame }
    }

    /// Reads the next raw payload.
    ///
    /// Returns `Ok(None)` if the stream ended cleanly between frames.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the stream fails or ends mid-frame
    /// - [`Error::FrameTooLarge`] if the declared length exceeds the limit
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let mut prefix = [0_u8; PREFIX_LEN];
        let mut filled = 0;

        while filled < PREFIX_LEN {
            let n = self.inner.read(&mut prefix[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(IoError::new(
                    ErrorKind::UnexpectedEof,
                    format!("stream ended after {filled} of {PREFIX_LEN} length bytes"),
                )
                .into());
            }
            filled += n;
        }

        let len = u32::from_le_bytes(prefix) as usize;
        if len > self.max_frame {
            return Err(Error::FrameTooLarge {
                size: len,
                max: self.max_frame,
            });
        }

        let mut payload = vec![0_u8; len];
        self.inner.read_exact(&mut payload).await?;

        trace!(len, "Frame read");
        Ok(Some(payload))
    }

    /// Reads and decodes the next message.
    ///
    /// Returns `Ok(None)` if the stream ended cleanly between frames.
    ///
    /// # Errors
    ///
    /// Everything [`FrameReader::read_frame`] returns, plus [`Error::Json`]
    /// for a payload that is not a message. After a JSON error the stream
    /// is still aligned on the next frame.
    pub async fn read_message(&mut self) -> Result<Option<Message>> {
        match self.read_frame().await? {
            Some(payload) => decode_payload(&payload).map(Some),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
