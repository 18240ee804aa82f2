//! Container creation and startup

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::ContainerEngine;
use crate::errors::ServiceError;

/// Creates and starts containers from built images.
pub struct ContainerLauncher {
    engine: Arc<dyn ContainerEngine>,
    internal_port: u16,
    launch_timeout: Duration,
}

impl ContainerLauncher {
    pub fn new(engine: Arc<dyn ContainerEngine>, internal_port: u16, launch_timeout: Duration) -> Self {
        Self {
            engine,
            internal_port,
            launch_timeout,
        }
    }

    /// Create a container from `tag` under `name`, binding the service port
    /// to `host_port`, then start it. A container whose start fails is
    /// removed before the error propagates, so a failed launch leaves no
    /// stopped container behind.
    pub async fn launch(
        &self,
        tag: &str,
        name: &str,
        host_port: u16,
    ) -> Result<String, ServiceError> {
        let created = tokio::time::timeout(
            self.launch_timeout,
            self.engine
                .create_container(tag, name, self.internal_port, host_port),
        )
        .await;

        let container = match created {
            Ok(Ok(container)) => container,
            Ok(Err(e)) => return Err(ServiceError::LaunchFailed(e.to_string())),
            Err(_) => {
                return Err(ServiceError::LaunchFailed(format!(
                    "create timed out after {:?}",
                    self.launch_timeout
                )))
            }
        };
        debug!("Created container {} ({})", name, container);

        let started =
            tokio::time::timeout(self.launch_timeout, self.engine.start_container(&container))
                .await;

        match started {
            Ok(Ok(())) => {
                info!("Started container {} on host port {}", name, host_port);
                Ok(container)
            }
            Ok(Err(e)) => {
                self.rollback(&container).await;
                Err(ServiceError::LaunchFailed(e.to_string()))
            }
            Err(_) => {
                self.rollback(&container).await;
                Err(ServiceError::LaunchFailed(format!(
                    "start timed out after {:?}",
                    self.launch_timeout
                )))
            }
        }
    }

    async fn rollback(&self, container: &str) {
        if let Err(e) = self.engine.remove_container(container).await {
            warn!("Failed to remove half-created container {}: {}", container, e);
        }
    }
}
