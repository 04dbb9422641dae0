//! Loopback port reservation.
//!
//! A port is picked by binding `127.0.0.1:0` and releasing the socket so the
//! engine can bind it. The registry remembers ports handed out to live and
//! test engines so two concurrent reservations never get the same port.

// ============================================================================
// Imports
// ============================================================================

use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tokio::net::TcpListener;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Bind attempts before giving up on finding an unreserved port.
const MAX_RESERVE_ATTEMPTS: usize = 16;

// ============================================================================
// Types
// ============================================================================

/// Set of ports currently held by a lease.
type ReservedSet = Arc<Mutex<FxHashSet<u16>>>;

// ============================================================================
// PortRegistry
// ============================================================================

/// Shared registry of reserved engine ports.
///
/// Cloning is cheap; clones share the same set.
#[derive(Clone, Default)]
pub struct PortRegistry {
    /// Ports held by outstanding leases.
    reserved: ReservedSet,
}

impl PortRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a free loopback port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFreePort`] if binding fails or every candidate was
    /// already reserved.
    pub async fn reserve(&self) -> Result<PortLease> {
        for _ in 0..MAX_RESERVE_ATTEMPTS {
            let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
                .await
                .map_err(Error::no_free_port)?;
            let port = listener.local_addr().map_err(Error::no_free_port)?.port();
            drop(listener);

            if self.reserved.lock().insert(port) {
                debug!(port, "Port reserved");
                return Ok(PortLease {
                    port,
                    reserved: Arc::clone(&self.reserved),
                });
            }

            debug!(port, "Port already leased, retrying");
        }

        Err(Error::NoFreePort {
            message: format!("no unreserved port after {MAX_RESERVE_ATTEMPTS} attempts"),
        })
    }

    /// Returns `true` if `port` is currently leased.
    #[inline]
    #[must_use]
    pub fn is_reserved(&self, port: u16) -> bool {
        self.reserved.lock().contains(&port)
    }

    /// Returns the number of outstanding leases.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.reserved.lock().len()
    }

    /// Returns `true` if no port is leased.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reserved.lock().is_empty()
    }
}

// ============================================================================
// PortLease
// ============================================================================

/// A reserved port, returned to the registry on drop.
#[derive(Debug)]
pub struct PortLease {
    /// Reserved port.
    port: u16,
    /// Registry the port is returned to.
    reserved: ReservedSet,
}

impl PortLease {
    /// Returns the reserved port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        self.reserved.lock().remove(&self.port);
        debug!(port = self.port, "Port released");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reserved_port_is_bindable() {
        let registry = PortRegistry::new();
        let lease = registry.reserve().await.expect("reserve");

        assert!(lease.port() > 0);
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, lease.port())).await;
        assert!(listener.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_leases_are_distinct() {
        let registry = PortRegistry::new();
        let mut leases = Vec::new();
        for _ in 0..8 {
            leases.push(registry.reserve().await.expect("reserve"));
        }

        let ports: FxHashSet<u16> = leases.iter().map(PortLease::port).collect();
        assert_eq!(ports.len(), 8);
        assert_eq!(registry.len(), 8);
    }

    #[tokio::test]
    async fn test_drop_releases_port() {
        let registry = PortRegistry::new();
        let lease = registry.reserve().await.expect("reserve");
        let port = lease.port();

        assert!(registry.is_reserved(port));
        drop(lease);
        assert!(!registry.is_reserved(port));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_reservations() {
        let registry = PortRegistry::new();
        let clone = registry.clone();
        let lease = clone.reserve().await.expect("reserve");

        assert!(registry.is_reserved(lease.port()));
    }
}
