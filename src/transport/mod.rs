//! Native messaging transport layer.
//!
//! This module frames messages over the byte streams the browser connects
//! to the host's standard input and output.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐        stdin (frames)        ┌─────────────────┐
//! │  Extension      │─────────────────────────────►│  FrameReader    │
//! │  (Background)   │                              │  → Host loop    │
//! │                 │◄─────────────────────────────│  ChannelWriter  │
//! └─────────────────┘        stdout (frames)       └─────────────────┘
//! ```
//!
//! The reader is owned by the dispatch loop. The writer is cloned into every
//! connectivity test task and serializes whole frames.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Length-prefixed framing and [`FrameReader`] |
//! | `writer` | Mutex-guarded [`ChannelWriter`] |

// ============================================================================
// Submodules
// ============================================================================

/// Length-prefixed framing.
pub mod codec;

/// Serialized writer.
pub mod writer;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{FrameReader, MAX_INBOUND_FRAME, decode_payload, encode_frame};
pub use writer::ChannelWriter;
