//! Homa host - native messaging bridge for a local proxy engine.
//!
//! The browser launches the host as a native messaging host. The extension
//! sends commands over standard input; the host answers over standard output
//! and manages Xray engine processes on its behalf.
//!
//! # Architecture
//!
//! ```text
//!   Extension ──frames──► Host ──► Supervisor ──► persistent xray (SOCKS :port)
//!       ▲                  │
//!       └────replies───────┴──► TestRunner ──► throwaway xray ──► HTTP probe
//! ```
//!
//! Key design principles:
//!
//! - At most one persistent engine; a new `START` replaces the old one
//! - Each `TEST` runs its own engine on its own port, concurrently
//! - Every reply carries the request's `id` and `cmd`
//! - No engine survives the host
//!
//! # Quick Start
//!
//! ```no_run
//! use homa_host::{Host, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut host = Host::builder().build()?;
//!     host.serve(tokio::io::stdin(), tokio::io::stdout()).await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`engine`] | Engine processes, configs, ports and probes |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`host`] | Message loop, dispatch and configuration |
//! | [`identifiers`] | Correlation token |
//! | [`protocol`] | Message envelope and commands |
//! | [`transport`] | Length-prefixed framing over stdio |

// ============================================================================
// Modules
// ============================================================================

/// Proxy engine lifecycle.
///
/// - [`Supervisor`] - Persistent engine
/// - [`TestRunner`] - Throwaway engines for connectivity tests
pub mod engine;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Native messaging host.
///
/// Use [`Host::builder()`] to create a configured host.
pub mod host;

/// Type-safe identifiers.
pub mod identifiers;

/// Message envelope and command names.
pub mod protocol;

/// Native messaging framing.
///
/// Internal module handling the length-prefixed stdio channel.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Engine types
pub use engine::{EngineStatus, PortRegistry, RuntimeConfig, Supervisor, TestRunner};

// Host types
pub use host::{
    Dispatch, EngineLogLevel, EngineOptions, Host, HostBuilder, INSTALL_DIR_ENV, InstallLayout,
    ProbeOptions, Readiness,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::MessageId;

// Protocol types
pub use protocol::{Command, Message, Status};
