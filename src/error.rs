//! Error types for the native messaging host.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use homa_host::{Result, Error};
//!
//! async fn example(supervisor: &mut Supervisor, fragment: &Value) -> Result<()> {
//!     let port = supervisor.start(fragment).await?;
//!     println!("engine listening on {port}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Channel | [`Error::ChannelClosed`], [`Error::FrameTooLarge`], [`Error::Io`] |
//! | Validation | [`Error::MissingConfig`], [`Error::InvalidArgument`], [`Error::Json`] |
//! | Engine | [`Error::NoFreePort`], [`Error::EngineNotFound`], [`Error::ProcessLaunchFailed`], [`Error::EngineExited`] |
//! | Probe | [`Error::ProbeStatus`], [`Error::Timeout`], [`Error::Http`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// The `Display` text of every variant is what the extension sees in the
/// `error` field of a reply, so it is kept short and human-readable.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Host configuration error.
    ///
    /// Returned when the host cannot be built (unresolvable install
    /// directory, invalid probe URL).
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Channel Errors
    // ========================================================================
    /// The native messaging channel is no longer writable.
    #[error("Channel closed")]
    ChannelClosed,

    /// A frame exceeded the allowed size.
    #[error("Frame of {size} bytes exceeds limit of {max} bytes")]
    FrameTooLarge {
        /// Declared or actual frame size.
        size: usize,
        /// Maximum accepted size.
        max: usize,
    },

    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// Request requires a routing fragment but none was supplied.
    #[error("Config is missing")]
    MissingConfig,

    /// Invalid argument in a request.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// No local port could be reserved.
    #[error("no free port: {message}")]
    NoFreePort {
        /// Underlying cause.
        message: String,
    },

    /// Engine executable not found at path.
    #[error("Proxy engine not found at: {path}")]
    EngineNotFound {
        /// Path where the executable was expected.
        path: PathBuf,
    },

    /// Failed to launch the engine process.
    #[error("failed to start xray: {message}")]
    ProcessLaunchFailed {
        /// Description of the launch failure.
        message: String,
    },

    /// The engine process exited before it became ready.
    #[error("xray exited during startup: {status}")]
    EngineExited {
        /// Exit status as reported by the OS.
        status: String,
    },

    // ========================================================================
    // Probe Errors
    // ========================================================================
    /// Probe endpoint answered with a non-success status.
    #[error("HTTP {status}")]
    ProbeStatus {
        /// HTTP status code received.
        status: u16,
    },

    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error.
    #[error("{0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a no free port error.
    #[inline]
    pub fn no_free_port(err: IoError) -> Self {
        Self::NoFreePort {
            message: err.to_string(),
        }
    }

    /// Creates an engine not found error.
    #[inline]
    pub fn engine_not_found(path: impl Into<PathBuf>) -> Self {
        Self::EngineNotFound { path: path.into() }
    }

    /// Creates a process launch failed error.
    #[inline]
    pub fn process_launch_failed(err: IoError) -> Self {
        Self::ProcessLaunchFailed {
            message: err.to_string(),
        }
    }

    /// Creates an engine exited error.
    #[inline]
    pub fn engine_exited(status: impl ToString) -> Self {
        Self::EngineExited {
            status: status.to_string(),
        }
    }

    /// Creates a probe status error.
    #[inline]
    pub fn probe_status(status: u16) -> Self {
        Self::ProbeStatus { status }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Reply Text
// ============================================================================

impl Error {
    /// Returns the text placed in a reply's `error` field.
    ///
    /// HTTP client errors hide the interesting part (connection refused,
    /// SOCKS failure, timeout) in their source chain, so it is appended.
    #[must_use]
    pub fn reply_text(&self) -> String {
        let mut text = self.to_string();
        if let Self::Http(e) = self {
            let mut source = std::error::Error::source(e);
            while let Some(cause) = source {
                text.push_str(": ");
                text.push_str(&cause.to_string());
                source = cause.source();
            }
        }
        text
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error ends the native messaging channel.
    ///
    /// Every other error is answered with a `status=error` reply.
    #[inline]
    #[must_use]
    pub fn is_channel_error(&self) -> bool {
        matches!(
            self,
            Self::ChannelClosed | Self::FrameTooLarge { .. } | Self::Io(_)
        )
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if the engine could not be brought up.
    #[inline]
    #[must_use]
    pub fn is_engine_error(&self) -> bool {
        matches!(
            self,
            Self::NoFreePort { .. }
                | Self::EngineNotFound { .. }
                | Self::ProcessLaunchFailed { .. }
                | Self::EngineExited { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
