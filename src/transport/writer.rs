//! Serialized frame writer shared by the dispatch loop and test tasks.
//!
//! Frames are encoded outside the lock and written as one buffer under a
//! single async mutex, so two replies never interleave on the wire. Any
//! write failure marks the channel closed for every clone.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, watch};
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::protocol::Message;

use super::codec::encode_frame;

// ============================================================================
// Types
// ============================================================================

/// Type-erased output stream (stdout in production).
type BoxedSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Internal shared state for the writer.
struct WriterInner {
    /// Output stream, one writer at a time.
    sink: Mutex<BoxedSink>,
    /// Flips to `true` after the first failed write.
    closed: watch::Sender<bool>,
}

// ============================================================================
// ChannelWriter
// ============================================================================

/// Cloneable handle for writing replies to the extension.
///
/// # Thread Safety
///
/// `ChannelWriter` is `Send + Sync`; clones share one sink and one lock.
#[derive(Clone)]
pub struct ChannelWriter {
    /// Shared inner state.
    inner: Arc<WriterInner>,
}

impl ChannelWriter {
    /// Wraps an output stream.
    #[must_use]
    pub fn new<W>(sink: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (closed, _) = watch::channel(false);
        Self {
            inner: Arc::new(WriterInner {
                sink: Mutex::new(Box::new(sink)),
                closed,
            }),
        }
    }

    /// Writes one framed message and flushes.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] if an earlier write already failed
    /// - [`Error::Io`] if this write fails; the channel is then closed
    /// - [`Error::Json`] if the message cannot be serialized (channel stays open)
    pub async fn write_message(&self, message: &Message) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }

        let frame = encode_frame(message)?;

        let mut sink = self.inner.sink.lock().await;
        let written: std::io::Result<()> = async {
            sink.write_all(&frame).await?;
            sink.flush().await
        }
        .await;

        if let Err(e) = written {
            warn!(error = %e, "Channel write failed");
            self.inner.closed.send_replace(true);
            return Err(e.into());
        }

        trace!(len = frame.len(), cmd = %message.cmd, "Frame written");
        Ok(())
    }

    /// Returns `true` once a write has failed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// Resolves when the channel has been marked closed.
    pub async fn closed(&self) {
        let mut rx = self.inner.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
