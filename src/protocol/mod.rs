//! Native messaging protocol message types.
//!
//! This module defines the message format exchanged between the browser
//! extension and the host.
//!
//! # Protocol Overview
//!
//! | Direction | Shape | Purpose |
//! |-----------|-------|---------|
//! | Extension → Host | [`Message`] with `cmd` (+ `id`, `config`) | Command request |
//! | Host → Extension | [`Message`] with `status` (+ `port`, `error`, `data`) | Correlated reply |
//!
//! There is no handshake and no unsolicited host → extension traffic.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Closed set of command names |
//! | `message` | Envelope and reply constructors |

// ============================================================================
// Submodules
// ============================================================================

/// Command names.
pub mod command;

/// Request and reply envelope.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::Command;
pub use message::{Message, Status};
