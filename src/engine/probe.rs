//! Reachability probe through a local SOCKS port.

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, Instant};

use reqwest::{Client, Proxy, StatusCode};
use tracing::debug;

use crate::error::{Error, Result};
use crate::host::ProbeOptions;

// ============================================================================
// Probe
// ============================================================================

/// Fetches the probe URL once through `socks5h://127.0.0.1:<port>`.
///
/// Name resolution happens on the far side of the proxy, so the probe
/// exercises the engine's routing fragment end to end.
///
/// # Returns
///
/// Time from sending the request until response headers arrived.
///
/// # Errors
///
/// - [`Error::Http`] for connect failures, SOCKS errors and timeouts
/// - [`Error::ProbeStatus`] for any status other than 200 or 204
pub async fn probe(port: u16, options: &ProbeOptions) -> Result<Duration> {
    let proxy = Proxy::all(format!("socks5h://127.0.0.1:{port}"))?;
    let client = Client::builder()
        .proxy(proxy)
        .timeout(options.timeout)
        .build()?;

    let started = Instant::now();
    let response = client.get(&options.url).send().await?;
    let latency = started.elapsed();
    let status = response.status();

    debug!(port, %status, latency_ms = latency.as_millis() as u64, "Probe answered");

    if is_reachable(status) {
        Ok(latency)
    } else {
        Err(Error::probe_status(status.as_u16()))
    }
}

/// 200 and 204 both count as reachable.
#[inline]
fn is_reachable(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::NO_CONTENT
}

// ============================================================================
// Tests
// ============================================================================
