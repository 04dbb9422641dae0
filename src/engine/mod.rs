//! Proxy engine lifecycle.
//!
//! The engine is an opaque executable started as `<engine> -c <config>` that
//! exposes a local SOCKS listener.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Supervisor`] | Owns the single persistent engine |
//! | [`TestRunner`] | Spawns throwaway engines and probes them |
//! | [`RuntimeConfig`] | Config document handed to an engine |
//! | [`PortRegistry`] | Loopback port reservations shared by both |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | Runtime configuration document |
//! | `ports` | Port reservation |
//! | `probe` | HTTP probe through SOCKS |
//! | `process` | Child process guard |
//! | `supervisor` | Persistent engine |
//! | `tester` | Connectivity tests |

// ============================================================================
// Submodules
// ============================================================================

/// Runtime configuration document.
pub mod config;

/// Loopback port reservation.
pub mod ports;

/// Reachability probe.
pub mod probe;

/// Engine child process handle.
pub mod process;

/// Persistent engine supervisor.
pub mod supervisor;

/// Ephemeral connectivity tests.
pub mod tester;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::RuntimeConfig;
pub use ports::{PortLease, PortRegistry};
pub use probe::probe;
pub use process::{EngineOutput, EngineProcess};
pub use supervisor::{EngineStatus, Supervisor};
pub use tester::{TestInstance, TestRunner};
