//! Persistent engine supervisor.
//!
//! Owns at most one live engine. `start` always stops the previous engine
//! first, so there is no "start while running" state and no orphaned
//! listener keeps an old port open.
//!
//! # Example
//!
//! ```ignore
//! let mut supervisor = Supervisor::new(layout, EngineOptions::default(), PortRegistry::new());
//!
//! let port = supervisor.start(&fragment).await?;
//! // point the browser at socks5://127.0.0.1:{port}
//!
//! supervisor.stop().await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::host::{EngineOptions, InstallLayout};

use super::config::RuntimeConfig;
use super::ports::PortRegistry;
use super::process::{EngineOutput, EngineProcess, spawn_engine};

// ============================================================================
// EngineStatus
// ============================================================================

/// Snapshot of the live engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    /// Process ID.
    pub pid: u32,
    /// Local SOCKS port.
    pub port: u16,
    /// Config file the engine was started with.
    pub config_path: PathBuf,
}

// ============================================================================
// Supervisor
// ============================================================================

/// Owner of the persistent engine handle.
///
/// Only the dispatch loop holds a `Supervisor`, and every operation takes
/// `&mut self`, so the handle is never touched concurrently.
pub struct Supervisor {
    /// Install paths.
    layout: Arc<InstallLayout>,
    /// Engine settings.
    options: EngineOptions,
    /// Port registry shared with the test runner.
    ports: PortRegistry,
    /// The live engine, if any.
    current: Option<EngineProcess>,
}

impl Supervisor {
    /// Creates a supervisor with no engine running.
    #[must_use]
    pub fn new(layout: Arc<InstallLayout>, options: EngineOptions, ports: PortRegistry) -> Self {
        Self {
            layout,
            options,
            ports,
            current: None,
        }
    }

    /// Starts the engine with `fragment` as its primary outbound.
    ///
    /// Any running engine is stopped first. On failure no engine is left
    /// running.
    ///
    /// # Returns
    ///
    /// The local SOCKS port. With the default fixed settle delay the port is
    /// only "probably ready".
    ///
    /// # Errors
    ///
    /// - [`Error::NoFreePort`](crate::Error::NoFreePort) if no port can be reserved
    /// - [`Error::InvalidArgument`](crate::Error::InvalidArgument) if `fragment` is not an object
    /// - [`Error::Io`](crate::Error::Io) if the config cannot be written
    /// - [`Error::EngineNotFound`](crate::Error::EngineNotFound) /
    ///   [`Error::ProcessLaunchFailed`](crate::Error::ProcessLaunchFailed) if spawning fails
    /// - [`Error::EngineExited`](crate::Error::EngineExited) if the engine dies while settling
    pub async fn start(&mut self, fragment: &Value) -> Result<u16> {
        self.stop().await?;

        let lease = self.ports.reserve().await?;
        let port = lease.port();

        let config = RuntimeConfig::new(port, fragment, self.options.log_level)?;
        let config_path = self.layout.run_config();
        config.write_to(&config_path).await?;

        let child = spawn_engine(
            self.layout.engine_binary(),
            &config_path,
            &EngineOutput::AppendTo(self.layout.engine_log()),
        )?;
        let mut engine = EngineProcess::persistent(child, lease, config_path);
        debug!(pid = engine.pid(), port, "Engine spawned, waiting for readiness");

        if let Err(e) = engine.wait_ready(&self.options.readiness).await {
            engine.terminate().await;
            return Err(e);
        }

        info!(pid = engine.pid(), port, "Engine started");
        self.current = Some(engine);
        Ok(port)
    }

    /// Stops the engine and waits until it has been reaped.
    ///
    /// Succeeds without doing anything when no engine is running.
    ///
    /// # Errors
    ///
    /// Currently infallible; termination problems are logged.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(mut engine) = self.current.take() else {
            debug!("Stop requested with no engine running");
            return Ok(());
        };

        let (pid, port) = (engine.pid(), engine.port());
        engine.terminate().await;
        info!(pid, port, "Engine stopped");
        Ok(())
    }

    /// Returns the live engine, if any.
    #[must_use]
    pub fn status(&self) -> Option<EngineStatus> {
        self.current.as_ref().map(|engine| EngineStatus {
            pid: engine.pid(),
            port: engine.port(),
            config_path: engine.config_path().to_path_buf(),
        })
    }

    /// Returns `true` if an engine is running.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Returns the port registry shared with the test runner.
    #[inline]
    #[must_use]
    pub fn ports(&self) -> &PortRegistry {
        &self.ports
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Some(engine) = self.current.take() {
            warn!(pid = engine.pid(), "Supervisor dropped with engine running, killing");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
