//! Runtime configuration document for the proxy engine.
//!
//! A fixed topology with the caller's routing fragment injected as the
//! primary outbound:
//!
//! ```json
//! {
//!   "log": { "loglevel": "warning" },
//!   "inbounds": [{
//!     "port": 41873, "protocol": "socks",
//!     "settings": { "auth": "noauth", "udp": true },
//!     "sniffing": { "enabled": true, "destOverride": ["http", "tls"] }
//!   }],
//!   "dns": { "servers": ["8.8.8.8", "1.1.1.1"], "queryStrategy": "UseIPv4" },
//!   "outbounds": [
//!     <routing fragment>,
//!     { "protocol": "freedom", "tag": "direct", "settings": { "domainStrategy": "UseIPv4" } }
//!   ]
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;

use serde::Serialize;
use serde_json::{Value, json};
use tokio::fs;
use tracing::debug;

use crate::error::{Error, Result};
use crate::host::EngineLogLevel;

// ============================================================================
// Constants
// ============================================================================

/// Resolvers the engine uses for its own lookups.
const DNS_SERVERS: [&str; 2] = ["8.8.8.8", "1.1.1.1"];

/// Address family preference for DNS and direct egress.
const QUERY_STRATEGY: &str = "UseIPv4";

// ============================================================================
// Sections
// ============================================================================

/// `log` section.
#[derive(Debug, Clone, Serialize)]
struct LogSection {
    loglevel: EngineLogLevel,
}

/// Local SOCKS inbound.
#[derive(Debug, Clone, Serialize)]
struct Inbound {
    port: u16,
    protocol: &'static str,
    settings: InboundSettings,
    sniffing: Sniffing,
}

/// SOCKS inbound settings.
#[derive(Debug, Clone, Serialize)]
struct InboundSettings {
    auth: &'static str,
    udp: bool,
}

/// Destination sniffing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Sniffing {
    enabled: bool,
    dest_override: [&'static str; 2],
}

/// `dns` section.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct DnsSection {
    servers: [&'static str; 2],
    query_strategy: &'static str,
}

// ============================================================================
// RuntimeConfig
// ============================================================================

/// Complete engine configuration for one engine instance.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeConfig {
    #[serde(skip)]
    port: u16,
    log: LogSection,
    inbounds: Vec<Inbound>,
    dns: DnsSection,
    outbounds: Vec<Value>,
}

impl RuntimeConfig {
    /// Builds the document for an engine listening on `port`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `fragment` is not a JSON object.
    pub fn new(port: u16, fragment: &Value, log_level: EngineLogLevel) -> Result<Self> {
        Self::validate_fragment(fragment)?;

        Ok(Self {
            port,
            log: LogSection {
                loglevel: log_level,
            },
            inbounds: vec![Inbound {
                port,
                protocol: "socks",
                settings: InboundSettings {
                    auth: "noauth",
                    udp: true,
                },
                sniffing: Sniffing {
                    enabled: true,
                    dest_override: ["http", "tls"],
                },
            }],
            dns: DnsSection {
                servers: DNS_SERVERS,
                query_strategy: QUERY_STRATEGY,
            },
            outbounds: vec![fragment.clone(), direct_outbound()],
        })
    }

    /// Checks that a routing fragment is structured data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for arrays and primitives.
    pub fn validate_fragment(fragment: &Value) -> Result<()> {
        if fragment.is_object() {
            Ok(())
        } else {
            Err(Error::invalid_argument(
                "routing config must be a JSON object",
            ))
        }
    }

    /// Returns the inbound SOCKS port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serializes as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Writes the document to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory or file cannot be written.
    pub async fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = self.to_json()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, bytes).await?;

        debug!(path = %path.display(), port = self.port(), "Engine config written");
        Ok(())
    }
}

/// Fallback route for traffic the primary outbound does not claim.
fn direct_outbound() -> Value {
    json!({
        "protocol": "freedom",
        "tag": "direct",
        "settings": { "domainStrategy": QUERY_STRATEGY },
    })
}

// ============================================================================
// Tests
// ============================================================================
