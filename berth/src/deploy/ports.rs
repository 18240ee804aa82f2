//! Host port allocation

use std::collections::HashSet;
use std::ops::RangeInclusive;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::errors::ServiceError;

/// Allocator for host ports in a bounded range.
///
/// Ports claimed by live deployments are tracked in-process; candidates are
/// additionally probed against the OS so ports bound by unrelated processes
/// are skipped. The claimed set stays locked for the whole scan, making
/// allocate-and-claim atomic with respect to concurrent callers.
pub struct PortAllocator {
    range: RangeInclusive<u16>,
    max_probes: usize,
    claimed: Mutex<HashSet<u16>>,
}

impl PortAllocator {
    pub fn new(range: RangeInclusive<u16>, max_probes: usize) -> Self {
        Self {
            range,
            max_probes,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    /// Pick an unclaimed, unbound port and record the claim.
    ///
    /// Probing is capped at `max_probes` OS binds; an exhausted scan fails
    /// with `NoPortAvailable` rather than retrying.
    pub async fn allocate(&self) -> Result<u16, ServiceError> {
        let mut claimed = self.claimed.lock().await;

        let mut probes = 0;
        for port in self.range.clone() {
            if claimed.contains(&port) {
                continue;
            }
            if probes >= self.max_probes {
                break;
            }
            probes += 1;

            // The probe listener is dropped immediately, freeing the port
            // for the container runtime to bind.
            match TcpListener::bind(("0.0.0.0", port)).await {
                Ok(listener) => {
                    drop(listener);
                    claimed.insert(port);
                    debug!("Allocated host port {}", port);
                    return Ok(port);
                }
                Err(e) => {
                    trace!("Port {} unavailable: {}", port, e);
                }
            }
        }

        Err(ServiceError::NoPortAvailable)
    }

    /// Release a claimed port. Releasing an unclaimed port is a no-op.
    pub async fn release(&self, port: u16) {
        if self.claimed.lock().await.remove(&port) {
            debug!("Released host port {}", port);
        }
    }

    /// Number of currently claimed ports.
    pub async fn claimed_count(&self) -> usize {
        self.claimed.lock().await.len()
    }

    pub async fn is_claimed(&self, port: u16) -> bool {
        self.claimed.lock().await.contains(&port)
    }
}
