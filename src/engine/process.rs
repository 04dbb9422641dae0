//! Engine child process handle.
//!
//! [`EngineProcess`] owns one spawned engine together with its port lease
//! and, for test instances, its temporary config file. Dropping it sends a
//! kill signal and removes the temporary file; [`EngineProcess::terminate`]
//! additionally waits until the OS has reaped the child.

// ============================================================================
// Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::host::Readiness;

use super::ports::PortLease;

// ============================================================================
// EngineOutput
// ============================================================================

/// Where the engine's stdout and stderr go.
///
/// The host's own stdout carries the framed channel and is never inherited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutput {
    /// Discard all output.
    Discard,
    /// Append both streams to a log file.
    AppendTo(PathBuf),
}

impl EngineOutput {
    /// Builds the stdout/stderr pair; falls back to discarding on open failure.
    fn stdio(&self) -> (Stdio, Stdio) {
        let Self::AppendTo(path) = self else {
            return (Stdio::null(), Stdio::null());
        };

        let opened = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|file| Ok((file.try_clone()?, file)));

        match opened {
            Ok((out, err)) => (Stdio::from(out), Stdio::from(err)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot open engine log, discarding output");
                (Stdio::null(), Stdio::null())
            }
        }
    }
}

// ============================================================================
// Spawning
// ============================================================================

/// Launches `<binary> -c <config>`.
///
/// # Errors
///
/// - [`Error::EngineNotFound`] if `binary` does not exist
/// - [`Error::ProcessLaunchFailed`] if the OS refuses to start it
pub fn spawn_engine(binary: &Path, config: &Path, output: &EngineOutput) -> Result<Child> {
    if !binary.exists() {
        return Err(Error::engine_not_found(binary));
    }

    let (stdout, stderr) = output.stdio();

    let mut cmd = Command::new(binary);
    cmd.arg("-c")
        .arg(config)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .kill_on_drop(true);

    cmd.spawn().map_err(Error::process_launch_failed)
}

// ============================================================================
// EngineProcess
// ============================================================================

/// A running engine instance.
#[derive(Debug)]
pub struct EngineProcess {
    /// The child process handle, `None` once terminated.
    child: Option<Child>,
    /// Process ID for logging.
    pid: u32,
    /// Port the engine was told to listen on.
    lease: PortLease,
    /// Config file passed to the engine.
    config_path: PathBuf,
    /// Whether the config file is deleted on termination.
    remove_config: bool,
}

impl EngineProcess {
    /// Wraps a long-lived engine; its config file is left in place.
    pub fn persistent(child: Child, lease: PortLease, config_path: PathBuf) -> Self {
        Self::new(child, lease, config_path, false)
    }

    /// Wraps a throwaway engine; its config file is deleted on termination.
    pub fn ephemeral(child: Child, lease: PortLease, config_path: PathBuf) -> Self {
        Self::new(child, lease, config_path, true)
    }

    fn new(child: Child, lease: PortLease, config_path: PathBuf, remove_config: bool) -> Self {
        let pid = child.id().unwrap_or(0);
        debug!(pid, port = lease.port(), "Engine process guard created");
        Self {
            child: Some(child),
            pid,
            lease,
            config_path,
            remove_config,
        }
    }

    /// Returns the process ID.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns the SOCKS port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.lease.port()
    }

    /// Returns the config file path.
    #[inline]
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Waits according to `readiness`.
    ///
    /// # Errors
    ///
    /// - [`Error::EngineExited`] if the engine died during startup
    /// - [`Error::Timeout`] if a connect probe never succeeded
    pub async fn wait_ready(&mut self, readiness: &Readiness) -> Result<()> {
        match *readiness {
            Readiness::FixedDelay(delay) => {
                sleep(delay).await;
                self.ensure_running()
            }
            Readiness::ConnectProbe { interval, timeout } => {
                self.poll_connect(interval, timeout).await
            }
        }
    }

    async fn poll_connect(&mut self, interval: Duration, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            self.ensure_running()?;

            if TcpStream::connect((Ipv4Addr::LOCALHOST, self.port()))
                .await
                .is_ok()
            {
                debug!(pid = self.pid, port = self.port(), "Engine accepting connections");
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(Error::timeout(
                    "engine readiness",
                    timeout.as_millis() as u64,
                ));
            }
            sleep(interval).await;
        }
    }

    /// Fails if the child has already exited.
    fn ensure_running(&mut self) -> Result<()> {
        if let Some(child) = self.child.as_mut()
            && let Some(status) = child.try_wait()?
        {
            warn!(pid = self.pid, %status, "Engine exited during startup");
            return Err(Error::engine_exited(status));
        }
        Ok(())
    }

    /// Kills the engine, waits for it to be reaped, and removes a temporary
    /// config file.
    pub async fn terminate(&mut self) {
        if let Some(mut child) = self.child.take() {
            debug!(pid = self.pid, "Killing engine process");
            if let Err(e) = child.kill().await {
                debug!(pid = self.pid, error = %e, "Failed to kill process");
            }
            if let Err(e) = child.wait().await {
                debug!(pid = self.pid, error = %e, "Failed to wait for process");
            }
            info!(pid = self.pid, port = self.port(), "Engine terminated");
        }

        if self.remove_config {
            self.remove_config = false;
            match tokio::fs::remove_file(&self.config_path).await {
                Ok(()) => debug!(path = %self.config_path.display(), "Removed test config"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %self.config_path.display(), error = %e, "Failed to remove test config");
                }
            }
        }
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take()
            && let Err(e) = child.start_kill()
        {
            debug!(pid = self.pid, error = %e, "Failed to send kill signal in Drop");
        }

        if self.remove_config
            && let Err(e) = std::fs::remove_file(&self.config_path)
            && e.kind() != ErrorKind::NotFound
        {
            debug!(path = %self.config_path.display(), error = %e, "Failed to remove config in Drop");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
