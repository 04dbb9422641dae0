//! Native messaging host.
//!
//! This module provides the entry point that the browser launches.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Host`] | Message loop and command dispatch |
//! | [`HostBuilder`] | Fluent configuration builder |
//! | [`InstallLayout`] | Paths under the install root |
//! | [`EngineOptions`] | Engine log level and readiness |
//! | [`ProbeOptions`] | Connectivity probe URL and timeout |
//!
//! # Example
//!
//! ```no_run
//! use homa_host::{Host, Result};
//!
//! # async fn example() -> Result<()> {
//! let mut host = Host::builder().build()?;
//! host.serve(tokio::io::stdin(), tokio::io::stdout()).await
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for host configuration.
pub mod builder;

/// Message loop and dispatch.
pub mod core;

/// Install directory layout.
pub mod layout;

/// Engine and probe options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::HostBuilder;
pub use core::{Dispatch, Host};
pub use layout::{INSTALL_DIR_ENV, InstallLayout};
pub use options::{
    DEFAULT_PROBE_TIMEOUT, DEFAULT_PROBE_URL, DEFAULT_SETTLE_DELAY, EngineLogLevel,
    EngineOptions, ProbeOptions, Readiness,
};
