//! Engine and probe options.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use homa_host::{EngineLogLevel, EngineOptions, ProbeOptions, Readiness};
//!
//! let engine = EngineOptions::new()
//!     .with_log_level(EngineLogLevel::Info)
//!     .with_readiness(Readiness::connect_probe(Duration::from_secs(2)));
//!
//! let probe = ProbeOptions::new().with_timeout(Duration::from_secs(3));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Pause after spawning the engine before its port is handed out.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Poll interval for [`Readiness::ConnectProbe`].
const DEFAULT_CONNECT_INTERVAL: Duration = Duration::from_millis(25);

/// Endpoint fetched through a test engine.
pub const DEFAULT_PROBE_URL: &str = "http://www.gstatic.com/generate_204";

/// Timeout for the whole probe request.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// EngineLogLevel
// ============================================================================

/// Engine `log.loglevel` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineLogLevel {
    /// Everything.
    Debug,
    /// Informational.
    Info,
    /// Warnings and errors.
    #[default]
    Warning,
    /// Errors only.
    Error,
    /// Silent.
    None,
}

impl EngineLogLevel {
    /// Returns the engine's spelling.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::None => "none",
        }
    }
}

impl fmt::Display for EngineLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Readiness
// ============================================================================

/// How long to wait after spawn before treating the engine's port as usable.
///
/// Both modes fail early if the engine process has already exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Sleep for a fixed time; the port is "probably ready" afterwards.
    FixedDelay(Duration),
    /// Poll TCP connects to the port until one succeeds or `timeout` elapses.
    ConnectProbe {
        /// Pause between attempts.
        interval: Duration,
        /// Total time budget.
        timeout: Duration,
    },
}

impl Readiness {
    /// Connect polling with the default interval.
    #[inline]
    #[must_use]
    pub const fn connect_probe(timeout: Duration) -> Self {
        Self::ConnectProbe {
            interval: DEFAULT_CONNECT_INTERVAL,
            timeout,
        }
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::FixedDelay(DEFAULT_SETTLE_DELAY)
    }
}

// ============================================================================
// EngineOptions
// ============================================================================

/// Settings applied to every engine the host spawns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Engine log level written into the runtime config.
    pub log_level: EngineLogLevel,

    /// Startup wait strategy.
    pub readiness: Readiness,
}

impl EngineOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the engine log level.
    #[inline]
    #[must_use]
    pub fn with_log_level(mut self, level: EngineLogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Sets the startup wait strategy.
    #[inline]
    #[must_use]
    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }
}

// ============================================================================
// ProbeOptions
// ============================================================================

/// Connectivity probe settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// URL fetched through the test engine; 200 or 204 means reachable.
    pub url: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl ProbeOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the probe URL.
    #[inline]
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the request timeout.
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_PROBE_URL.to_string(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_readiness_is_fixed_delay() {
        assert_eq!(
            Readiness::default(),
            Readiness::FixedDelay(Duration::from_millis(200))
        );
    }

    #[test]
    fn test_default_engine_log_level() {
        assert_eq!(EngineOptions::new().log_level.as_str(), "warning");
    }

    #[test]
    fn test_log_level_serializes_lowercase() {
        let json = serde_json::to_string(&EngineLogLevel::None).expect("serialize");
        assert_eq!(json, "\"none\"");
    }

    #[test]
    fn test_probe_defaults() {
        let probe = ProbeOptions::default();
        assert_eq!(probe.url, "http://www.gstatic.com/generate_204");
        assert_eq!(probe.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_methods() {
        let engine = EngineOptions::new()
            .with_log_level(EngineLogLevel::Debug)
            .with_readiness(Readiness::connect_probe(Duration::from_secs(1)));

        assert_eq!(engine.log_level, EngineLogLevel::Debug);
        assert!(matches!(
            engine.readiness,
            Readiness::ConnectProbe { timeout, .. } if timeout == Duration::from_secs(1)
        ));

        let probe = ProbeOptions::new().with_url("http://127.0.0.1/ok");
        assert_eq!(probe.url, "http://127.0.0.1/ok");
    }
}
