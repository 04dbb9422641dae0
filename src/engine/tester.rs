//! Ephemeral connectivity tests.
//!
//! Each test gets its own engine on its own port with its own config file,
//! independent of the persistent engine, so a live connection is never
//! disturbed by a test and concurrent tests never share files or ports.
//!
//! # Lifecycle
//!
//! 1. [`TestRunner::launch`] reserves a port, writes `config_test_<port>.json`
//!    and spawns the engine
//! 2. [`probe`] fetches the probe URL through the engine
//! 3. [`TestInstance::release`] kills and reaps the engine, deletes the file
//!    and frees the port
//!
//! [`TestRunner::run`] performs all three and always releases.

// ============================================================================
// Imports
// ============================================================================

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::host::{EngineOptions, InstallLayout, ProbeOptions};

use super::config::RuntimeConfig;
use super::ports::PortRegistry;
use super::probe::probe;
use super::process::{EngineOutput, EngineProcess, spawn_engine};

// ============================================================================
// TestRunner
// ============================================================================

/// Spawns throwaway engines for connectivity tests.
///
/// # Thread Safety
///
/// `TestRunner` is `Send + Sync`; share it behind an `Arc` across tasks.
pub struct TestRunner {
    /// Install paths.
    layout: Arc<InstallLayout>,
    /// Engine settings.
    engine: EngineOptions,
    /// Probe settings.
    probe: ProbeOptions,
    /// Port registry shared with the supervisor.
    ports: PortRegistry,
}

impl TestRunner {
    /// Creates a test runner.
    #[must_use]
    pub fn new(
        layout: Arc<InstallLayout>,
        engine: EngineOptions,
        probe: ProbeOptions,
        ports: PortRegistry,
    ) -> Self {
        Self {
            layout,
            engine,
            probe,
            ports,
        }
    }

    /// Launches a test engine for `fragment`.
    ///
    /// The returned instance must be released; dropping it only sends a kill
    /// signal without waiting.
    ///
    /// # Errors
    ///
    /// Same as [`Supervisor::start`](super::Supervisor::start). On failure the
    /// temporary config file is already removed.
    pub async fn launch(&self, fragment: &Value) -> Result<TestInstance> {
        let lease = self.ports.reserve().await?;
        let port = lease.port();

        let config = RuntimeConfig::new(port, fragment, self.engine.log_level)?;
        let config_path = self.layout.test_config(port);
        config.write_to(&config_path).await?;

        let child = match spawn_engine(
            self.layout.engine_binary(),
            &config_path,
            &EngineOutput::Discard,
        ) {
            Ok(child) => child,
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&config_path).await
                    && remove_err.kind() != ErrorKind::NotFound
                {
                    warn!(path = %config_path.display(), error = %remove_err, "Failed to remove test config");
                }
                return Err(e);
            }
        };

        let mut instance = TestInstance {
            engine: EngineProcess::ephemeral(child, lease, config_path),
        };
        debug!(pid = instance.pid(), port, "Test engine spawned");

        if let Err(e) = instance.engine.wait_ready(&self.engine.readiness).await {
            instance.release().await;
            return Err(e);
        }

        Ok(instance)
    }

    /// Launches, probes and releases.
    ///
    /// # Returns
    ///
    /// Probe latency.
    ///
    /// # Errors
    ///
    /// Any launch error, or the probe failure.
    pub async fn run(&self, fragment: &Value) -> Result<Duration> {
        let instance = self.launch(fragment).await?;
        let port = instance.port();

        let outcome = probe(port, &self.probe).await;
        instance.release().await;

        match &outcome {
            Ok(latency) => info!(port, latency_ms = latency.as_millis() as u64, "Test passed"),
            Err(e) => info!(port, error = %e, "Test failed"),
        }
        outcome
    }

    /// Returns the probe settings.
    #[inline]
    #[must_use]
    pub fn probe_options(&self) -> &ProbeOptions {
        &self.probe
    }
}

// ============================================================================
// TestInstance
// ============================================================================

/// A running test engine.
#[derive(Debug)]
pub struct TestInstance {
    /// Engine with an ephemeral config file.
    engine: EngineProcess,
}

impl TestInstance {
    /// Returns the SOCKS port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.engine.port()
    }

    /// Returns the process ID.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.engine.pid()
    }

    /// Returns the temporary config file path.
    #[inline]
    #[must_use]
    pub fn config_path(&self) -> &Path {
        self.engine.config_path()
    }

    /// Kills and reaps the engine, removes the config file and frees the port.
    pub async fn release(mut self) {
        self.engine.terminate().await;
    }
}

// ============================================================================
// Tests
// ============================================================================
