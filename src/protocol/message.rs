//! Message envelope exchanged with the extension.
//!
//! Requests and replies share one shape. Absent fields are omitted on the
//! wire, except `cmd` which is always written.
//!
//! # Format
//!
//! Request:
//! ```json
//! { "id": "4b1e...", "cmd": "START", "config": { "protocol": "vless", ... } }
//! ```
//!
//! Replies:
//! ```json
//! { "id": "4b1e...", "cmd": "START", "status": "ok", "port": 41873 }
//! { "id": "77aa...", "cmd": "TEST", "status": "ok", "data": 182 }
//! { "id": "77aa...", "cmd": "TEST", "status": "error", "error": "HTTP 502" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::MessageId;

use super::Command;

// ============================================================================
// Status
// ============================================================================

/// Reply status discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Command succeeded.
    Ok,
    /// Answer to `PING`.
    Pong,
    /// Command failed; `error` holds the reason.
    Error,
}

// ============================================================================
// Message
// ============================================================================

/// A request or reply on the native messaging channel.
///
/// `Message::default()` is the zero-value message that an empty frame
/// decodes to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Correlation token, echoed on the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,

    /// Command name.
    #[serde(default)]
    pub cmd: Command,

    /// Routing fragment for `TEST` and `START`. JSON `null` reads as absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,

    /// Local SOCKS port of a started engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Reply status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    /// Reason, present iff `status` is [`Status::Error`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Free-form payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ============================================================================
// Message - Requests
// ============================================================================

impl Message {
    /// Creates a message carrying only a command.
    #[inline]
    #[must_use]
    pub fn new(cmd: impl Into<Command>) -> Self {
        Self {
            cmd: cmd.into(),
            ..Self::default()
        }
    }

    /// Sets the correlation token.
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<MessageId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the routing fragment.
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = Some(config);
        self
    }

    /// Extracts `id` and `cmd` from a payload that failed to decode.
    ///
    /// Only string values are taken; anything unreadable leaves the field
    /// at its default, so the result is always usable with [`Message::error`].
    #[must_use]
    pub fn header_of(payload: &[u8]) -> Self {
        let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(payload) else {
            return Self::default();
        };

        let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            id: text("id").map(MessageId::new),
            cmd: text("cmd").map(Command::from).unwrap_or_default(),
            ..Self::default()
        }
    }
}

// ============================================================================
// Message - Replies
// ============================================================================

impl Message {
    /// Creates an empty reply correlated to `request` (same `id` and `cmd`).
    #[inline]
    #[must_use]
    pub fn reply_to(request: &Message) -> Self {
        Self {
            id: request.id.clone(),
            cmd: request.cmd.clone(),
            ..Self::default()
        }
    }

    /// Creates a `pong` reply.
    #[must_use]
    pub fn pong(request: &Message) -> Self {
        Self {
            status: Some(Status::Pong),
            data: Some(Value::from("pong")),
            ..Self::reply_to(request)
        }
    }

    /// Creates an `ok` reply.
    #[must_use]
    pub fn ok(request: &Message) -> Self {
        Self {
            status: Some(Status::Ok),
            ..Self::reply_to(request)
        }
    }

    /// Creates an `error` reply with a human-readable reason.
    #[must_use]
    pub fn error(request: &Message, reason: impl Into<String>) -> Self {
        Self {
            status: Some(Status::Error),
            error: Some(reason.into()),
            ..Self::reply_to(request)
        }
    }

    /// Sets the port field.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the data field.
    #[inline]
    #[must_use]
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Returns `true` if this is an error reply.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == Some(Status::Error)
    }

    /// Returns `true` if `other` carries the same `id` and `cmd`.
    #[inline]
    #[must_use]
    pub fn correlates_with(&self, other: &Message) -> bool {
        self.id == other.id && self.cmd == other.cmd
    }
}

// ============================================================================
// Tests
// ============================================================================
