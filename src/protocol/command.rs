//! Command names understood by the host.
//!
//! # Commands
//!
//! | Wire name | Reply |
//! |-----------|-------|
//! | `PING` | synchronous `pong` |
//! | `TEST` | deferred, from a spawned connectivity test |
//! | `START` | synchronous `ok` + `port`, or `error` |
//! | `STOP` | synchronous `ok` or `error` |
//!
//! Any other string is kept as [`Command::Unknown`] so the reply can echo it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Command
// ============================================================================

/// A request command.
///
/// Serialized as the bare wire name in the `cmd` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Command {
    /// Liveness check.
    Ping,
    /// Connectivity test of a routing fragment on a throwaway engine.
    Test,
    /// (Re)start the persistent engine with a routing fragment.
    Start,
    /// Stop the persistent engine.
    Stop,
    /// Unrecognized command, kept verbatim.
    Unknown(String),
}

// ============================================================================
// Command - Implementation
// ============================================================================

impl Command {
    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ping => "PING",
            Self::Test => "TEST",
            Self::Start => "START",
            Self::Stop => "STOP",
            Self::Unknown(name) => name,
        }
    }

    /// Returns `true` if this command requires a routing fragment.
    #[inline]
    #[must_use]
    pub fn requires_config(&self) -> bool {
        matches!(self, Self::Test | Self::Start)
    }

    /// Returns `true` if the reply comes from a spawned task.
    #[inline]
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Test)
    }
}

impl Default for Command {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Command {
    fn from(name: String) -> Self {
        match name.as_str() {
            "PING" => Self::Ping,
            "TEST" => Self::Test,
            "START" => Self::Start,
            "STOP" => Self::Stop,
            _ => Self::Unknown(name),
        }
    }
}

impl From<&str> for Command {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<Command> for String {
    fn from(command: Command) -> Self {
        match command {
            Command::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
