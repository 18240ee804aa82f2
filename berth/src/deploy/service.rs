//! Deployment orchestration

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::deploy::builder::ImageBuilder;
use crate::deploy::launcher::ContainerLauncher;
use crate::deploy::lifecycle::LifecycleManager;
use crate::deploy::ports::PortAllocator;
use crate::errors::ServiceError;
use crate::models::deployment::{Deployment, DeploymentState};

/// Outcome of a successful deploy
#[derive(Debug, Clone, Serialize)]
pub struct DeployReceipt {
    pub id: Uuid,
    pub url: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in_minutes: u64,
}

/// Drives a deploy request through build, port allocation, launch and
/// registration, strictly in that order.
///
/// A stage that fails aborts the request and compensates for everything
/// acquired so far: the allocated port is released, the artifact file is
/// deleted. The built image is left for external reaping.
pub struct DeploymentService {
    builder: ImageBuilder,
    launcher: ContainerLauncher,
    ports: Arc<PortAllocator>,
    lifecycle: Arc<LifecycleManager>,
    ttl: Duration,
}

impl DeploymentService {
    pub fn new(
        builder: ImageBuilder,
        launcher: ContainerLauncher,
        ports: Arc<PortAllocator>,
        lifecycle: Arc<LifecycleManager>,
        ttl: Duration,
    ) -> Self {
        Self {
            builder,
            launcher,
            ports,
            lifecycle,
            ttl,
        }
    }

    /// Deploy the artifact at `artifact_path` and return the access URL,
    /// composed from `host` and the allocated port.
    pub async fn deploy(
        &self,
        artifact_path: PathBuf,
        host: &str,
    ) -> Result<DeployReceipt, ServiceError> {
        let mut deployment = Deployment::new(artifact_path, self.ttl);
        let id = deployment.id;
        info!(
            "Deploying {} from {}",
            id,
            deployment.artifact_path.display()
        );

        // Building
        if let Err(e) = self
            .builder
            .build(&deployment.artifact_path, &deployment.image_tag)
            .await
        {
            self.abort(&mut deployment, &e).await;
            return Err(e);
        }

        // PortAllocated
        let host_port = match self.ports.allocate().await {
            Ok(port) => port,
            Err(e) => {
                self.abort(&mut deployment, &e).await;
                return Err(e);
            }
        };
        deployment.host_port = Some(host_port);
        deployment
            .advance(DeploymentState::PortAllocated)
            .map_err(ServiceError::StateError)?;

        // Launching
        deployment
            .advance(DeploymentState::Launching)
            .map_err(ServiceError::StateError)?;
        let container = match self
            .launcher
            .launch(&deployment.image_tag, &deployment.container_name(), host_port)
            .await
        {
            Ok(container) => container,
            Err(e) => {
                self.ports.release(host_port).await;
                self.abort(&mut deployment, &e).await;
                return Err(e);
            }
        };
        deployment.container_ref = Some(container);

        // Running
        deployment
            .advance(DeploymentState::Running)
            .map_err(ServiceError::StateError)?;

        let url = format!("http://{}:{}", host, host_port);
        let expires_at = deployment.expires_at;
        self.lifecycle.register(deployment, self.ttl).await;

        info!("Deployment {} running at {}", id, url);
        Ok(DeployReceipt {
            id,
            url,
            expires_at,
            expires_in_minutes: self.ttl.as_secs() / 60,
        })
    }

    /// Compensation shared by every failed stage: mark the deployment failed
    /// and delete its artifact file. The failing stage's arm releases the
    /// port, when one was allocated, before calling this.
    async fn abort(&self, deployment: &mut Deployment, cause: &ServiceError) {
        error!("Deployment {} failed: {}", deployment.id, cause);
        deployment.fail();

        if let Err(e) = tokio::fs::remove_file(&deployment.artifact_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to delete artifact {}: {}",
                    deployment.artifact_path.display(),
                    e
                );
            }
        }
    }
}
