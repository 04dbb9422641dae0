//! Install directory layout.
//!
//! The installer creates a fixed tree; the host only reads from `bin/` and
//! writes into `config/`.
//!
//! ```text
//! <root>/
//!  ├── bin/xray[.exe]              proxy engine
//!  └── config/
//!       ├── config_run.json        persistent engine config
//!       ├── config_test_<port>.json
//!       ├── homa.log               engine stdout/stderr
//!       └── homa-host.log          host log
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Environment variable overriding the install root.
pub const INSTALL_DIR_ENV: &str = "HOMA_INSTALL_DIR";

/// Engine executable name without extension.
const ENGINE_NAME: &str = "xray";

/// Config file of the persistent engine.
const RUN_CONFIG_NAME: &str = "config_run.json";

/// Engine output log.
const ENGINE_LOG_NAME: &str = "homa.log";

/// Host log.
const HOST_LOG_NAME: &str = "homa-host.log";

// ============================================================================
// InstallLayout
// ============================================================================

/// Paths under the install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    /// Install root.
    root: PathBuf,
    /// Engine executable, `bin/xray` unless overridden.
    engine_binary: PathBuf,
}

impl InstallLayout {
    /// Creates a layout rooted at `root` with the default engine path.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let engine_binary = root
            .join("bin")
            .join(format!("{ENGINE_NAME}{}", env::consts::EXE_SUFFIX));
        Self {
            root,
            engine_binary,
        }
    }

    /// Resolves the layout from `HOMA_INSTALL_DIR` or the platform default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no home directory can be determined.
    pub fn resolve() -> Result<Self> {
        match env::var_os(INSTALL_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Ok(Self::new(dir)),
            _ => Self::default_root().map(Self::new),
        }
    }

    /// Returns the per-platform install root.
    ///
    /// | Platform | Root |
    /// |----------|------|
    /// | Windows | `%LOCALAPPDATA%\Homa` |
    /// | macOS | `~/Library/Application Support/Homa` |
    /// | Linux | `$XDG_CONFIG_HOME/homa` |
    /// | other | `~/homa` |
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base directory is unknown.
    pub fn default_root() -> Result<PathBuf> {
        let base = if cfg!(target_os = "windows") {
            dirs::data_local_dir().map(|d| d.join("Homa"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir().map(|d| d.join("Homa"))
        } else if cfg!(target_os = "linux") {
            dirs::config_dir().map(|d| d.join("homa"))
        } else {
            dirs::home_dir().map(|d| d.join("homa"))
        };

        base.ok_or_else(|| {
            Error::config(format!(
                "cannot determine install directory; set {INSTALL_DIR_ENV}"
            ))
        })
    }

    /// Overrides the engine executable path.
    #[inline]
    #[must_use]
    pub fn with_engine_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.engine_binary = path.into();
        self
    }
}

// ============================================================================
// InstallLayout - Accessors
// ============================================================================

impl InstallLayout {
    /// Install root.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for generated configs and logs.
    #[inline]
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    /// Engine executable.
    #[inline]
    #[must_use]
    pub fn engine_binary(&self) -> &Path {
        &self.engine_binary
    }

    /// Config handed to the persistent engine.
    #[inline]
    #[must_use]
    pub fn run_config(&self) -> PathBuf {
        self.config_dir().join(RUN_CONFIG_NAME)
    }

    /// Config handed to a test engine bound to `port`.
    #[inline]
    #[must_use]
    pub fn test_config(&self, port: u16) -> PathBuf {
        self.config_dir().join(format!("config_test_{port}.json"))
    }

    /// Engine stdout/stderr destination.
    #[inline]
    #[must_use]
    pub fn engine_log(&self) -> PathBuf {
        self.config_dir().join(ENGINE_LOG_NAME)
    }

    /// Host log destination.
    #[inline]
    #[must_use]
    pub fn host_log(&self) -> PathBuf {
        self.config_dir().join(HOST_LOG_NAME)
    }
}

// ============================================================================
// Tests
// ============================================================================
