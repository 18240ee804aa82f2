//! Deployment registry and expiry-driven teardown

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::deploy::ports::PortAllocator;
use crate::engine::ContainerEngine;
use crate::errors::ServiceError;
use crate::models::deployment::{Deployment, DeploymentState};

struct ActiveDeployment {
    deployment: Deployment,
    timer: Option<JoinHandle<()>>,
}

/// Owns the registry of live deployments and reclaims their resources.
///
/// The registry is the single source of truth for which containers and ports
/// are alive. Teardown is claimed through the `Running -> ExpiringSoon`
/// transition taken under the registry lock: whichever trigger claims it
/// first (timer fire, manual cancellation, shutdown) runs the cleanup steps,
/// and every later trigger no-ops.
pub struct LifecycleManager {
    engine: Arc<dyn ContainerEngine>,
    ports: Arc<PortAllocator>,
    registry: Mutex<HashMap<Uuid, ActiveDeployment>>,
}

impl LifecycleManager {
    pub fn new(engine: Arc<dyn ContainerEngine>, ports: Arc<PortAllocator>) -> Self {
        Self {
            engine,
            ports,
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a running deployment and arm its one-shot expiry timer.
    pub async fn register(self: &Arc<Self>, deployment: Deployment, ttl: Duration) {
        let id = deployment.id;

        let manager = Arc::clone(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            manager.expire(id).await;
        });

        let mut registry = self.registry.lock().await;
        registry.insert(
            id,
            ActiveDeployment {
                deployment,
                timer: Some(timer),
            },
        );
        info!("Registered deployment {} (expires in {:?})", id, ttl);
    }

    /// Expiry trigger: timer fire or explicit request.
    pub async fn expire(&self, id: Uuid) {
        self.teardown(id, "expired").await;
    }

    /// Disarm the timer and tear the deployment down immediately.
    ///
    /// Returns false when the id is not in the registry (never deployed, or
    /// already cleaned up).
    pub async fn cancel(&self, id: Uuid) -> bool {
        {
            let mut registry = self.registry.lock().await;
            match registry.get_mut(&id) {
                Some(active) => {
                    if let Some(timer) = active.timer.take() {
                        timer.abort();
                    }
                }
                None => return false,
            }
        }

        self.teardown(id, "cancelled").await;
        true
    }

    /// Cancel every active deployment. Used on graceful shutdown.
    pub async fn cancel_all(&self) {
        let ids: Vec<Uuid> = self.registry.lock().await.keys().copied().collect();
        if ids.is_empty() {
            return;
        }

        info!("Cancelling {} active deployment(s)", ids.len());
        for id in ids {
            self.cancel(id).await;
        }
    }

    pub async fn lookup(&self, id: Uuid) -> Option<Deployment> {
        self.registry
            .lock()
            .await
            .get(&id)
            .map(|active| active.deployment.clone())
    }

    pub async fn list(&self) -> Vec<Deployment> {
        self.registry
            .lock()
            .await
            .values()
            .map(|active| active.deployment.clone())
            .collect()
    }

    pub async fn active_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Run the cleanup steps for `id` at most once.
    ///
    /// Steps are best-effort: a failed step is recorded and the remaining
    /// steps still run. Containers already stopped or removed externally and
    /// artifact files already gone count as satisfied. Step failures are
    /// aggregated into a single log entry; nothing propagates to a caller.
    async fn teardown(&self, id: Uuid, reason: &str) {
        let claimed = {
            let mut registry = self.registry.lock().await;
            match registry.get_mut(&id) {
                Some(active) => match active
                    .deployment
                    .advance(DeploymentState::ExpiringSoon)
                {
                    Ok(()) => Some(active.deployment.clone()),
                    Err(_) => {
                        debug!("Teardown of {} already claimed, skipping", id);
                        None
                    }
                },
                None => None,
            }
        };
        let Some(deployment) = claimed else { return };

        info!("Tearing down deployment {} ({})", id, reason);
        let mut failures: Vec<String> = Vec::new();

        if let Some(container) = &deployment.container_ref {
            if let Err(e) = self.engine.stop_container(container).await {
                failures.push(format!("stop container: {}", e));
            }
            if let Err(e) = self.engine.remove_container(container).await {
                failures.push(format!("remove container: {}", e));
            }
        }

        if let Some(port) = deployment.host_port {
            self.ports.release(port).await;
        }

        match tokio::fs::remove_file(&deployment.artifact_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => failures.push(format!("delete artifact: {}", e)),
        }

        // The built image is intentionally retained; operators reap images
        // out of band.

        {
            let mut registry = self.registry.lock().await;
            if let Some(mut active) = registry.remove(&id) {
                // Disarm the timer in case a different trigger got here
                // first. Aborting a finished task is a no-op, and no awaits
                // remain below, so a timer-driven teardown is not cut short.
                if let Some(timer) = active.timer.take() {
                    timer.abort();
                }
                if let Err(e) = active.deployment.advance(DeploymentState::Cleaned) {
                    warn!("Deployment {} left registry in state {:?}: {}", id, active.deployment.state, e);
                }
            }
        }

        if failures.is_empty() {
            info!("Deployment {} cleaned up", id);
        } else {
            let summary = ServiceError::CleanupPartialFailure(failures.join("; "));
            error!("Deployment {}: {}", id, summary);
        }
    }
}
