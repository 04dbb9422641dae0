//! Builder pattern for host configuration.
//!
//! Provides a fluent API for configuring and creating [`Host`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use homa_host::{EngineLogLevel, Host};
//!
//! # fn example() -> homa_host::Result<()> {
//! let host = Host::builder()
//!     .install_dir("/opt/homa")
//!     .log_level(EngineLogLevel::Info)
//!     .probe_timeout(Duration::from_secs(3))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

use super::core::Host;
use super::layout::InstallLayout;
use super::options::{EngineLogLevel, EngineOptions, ProbeOptions, Readiness};

// ============================================================================
// HostBuilder
// ============================================================================

/// Builder for configuring a [`Host`] instance.
///
/// Use [`Host::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct HostBuilder {
    /// Install root; resolved from the environment when unset.
    install_dir: Option<PathBuf>,
    /// Engine executable override.
    engine_binary: Option<PathBuf>,
    /// Engine settings.
    engine: EngineOptions,
    /// Probe settings.
    probe: ProbeOptions,
}

// ============================================================================
// HostBuilder Implementation
// ============================================================================

impl HostBuilder {
    /// Creates a new builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the install root.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory holding `bin/` and `config/`
    #[inline]
    #[must_use]
    pub fn install_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(path.into());
        self
    }

    /// Overrides the engine executable path.
    ///
    /// # Arguments
    ///
    /// * `path` - Engine executable (default `<root>/bin/xray`)
    #[inline]
    #[must_use]
    pub fn engine_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.engine_binary = Some(path.into());
        self
    }

    /// Sets the engine log level.
    #[inline]
    #[must_use]
    pub fn log_level(mut self, level: EngineLogLevel) -> Self {
        self.engine.log_level = level;
        self
    }

    /// Sets the startup wait strategy.
    #[inline]
    #[must_use]
    pub fn readiness(mut self, readiness: Readiness) -> Self {
        self.engine.readiness = readiness;
        self
    }

    /// Shorthand for [`Readiness::FixedDelay`].
    #[inline]
    #[must_use]
    pub fn settle_delay(self, delay: Duration) -> Self {
        self.readiness(Readiness::FixedDelay(delay))
    }

    /// Sets the URL fetched by connectivity tests.
    #[inline]
    #[must_use]
    pub fn probe_url(mut self, url: impl Into<String>) -> Self {
        self.probe.url = url.into();
        self
    }

    /// Sets the probe request timeout.
    #[inline]
    #[must_use]
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe.timeout = timeout;
        self
    }

    /// Builds the host with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the install root cannot be resolved
    /// - [`Error::Config`] if the probe URL is not an absolute http(s) URL
    /// - [`Error::Config`] if the probe timeout is zero
    pub fn build(self) -> Result<Host> {
        self.validate_probe()?;
        let layout = self.resolve_layout()?;

        Ok(Host::new(layout, self.engine, self.probe))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl HostBuilder {
    /// Validates the probe settings.
    fn validate_probe(&self) -> Result<()> {
        let url = Url::parse(&self.probe.url).map_err(|e| {
            Error::config(format!("invalid probe URL '{}': {e}", self.probe.url))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "probe URL must be http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.probe.timeout.is_zero() {
            return Err(Error::config("probe timeout must be greater than zero"));
        }

        Ok(())
    }

    /// Resolves install paths.
    fn resolve_layout(&self) -> Result<InstallLayout> {
        let layout = match &self.install_dir {
            Some(dir) => InstallLayout::new(dir),
            None => InstallLayout::resolve()?,
        };

        Ok(match &self.engine_binary {
            Some(binary) => layout.with_engine_binary(binary),
            None => layout,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
